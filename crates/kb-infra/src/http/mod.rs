mod backend;

pub use backend::HttpBackend;
