pub mod preprocessor;
pub mod report_writer;
pub mod summarizer;
pub mod vision_llm;

pub use preprocessor::ImagePreprocessor;
pub use report_writer::ReportWriter;
pub use summarizer::Summarizer;
pub use vision_llm::{parse_feedback, ParseOutcome, VisionLlmService, VisionModel};
