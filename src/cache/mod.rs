mod cache;

pub use cache::TemplateCache;
