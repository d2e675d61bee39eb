pub mod dataset;
pub mod http;
pub mod source;
pub mod tmdb;

pub use dataset::DatasetIndex;
pub use http::HttpClient;
pub use source::SourceClient;
pub use tmdb::TmdbClient;
