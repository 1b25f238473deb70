pub mod file_store;
pub mod openai_generator;
pub mod relay_generator;

pub use file_store::FileStore;
pub use openai_generator::OpenAiGeneratorAdapter;
pub use relay_generator::RelayGeneratorAdapter;
