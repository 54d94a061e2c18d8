pub mod db;

pub use db::{
    count_results, create_db, get_result, insert_result, list_results, DbPool, NewOcrResult,
    OcrResultRecord,
};
