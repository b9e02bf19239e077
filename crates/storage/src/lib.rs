pub mod db;

pub use db::{
    create_db, get_all_analyses, get_image, insert_analysis, insert_image, DbPool, StorageError,
    StoredImage,
};
