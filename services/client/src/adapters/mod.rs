pub mod files;
pub mod http;
pub mod storage;

pub use files::load_upload_file;
pub use http::ReqwestTransport;
pub use storage::FileSessionStore;
