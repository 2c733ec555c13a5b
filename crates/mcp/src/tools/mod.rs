pub mod docs;
pub mod instructions;
pub mod ocsf;
pub mod pipeline;
mod registry;

pub use docs::{DocsMetadataTool, ListDocsTool, ReadDocsTool};
pub use instructions::{Guidance, OcsfInstructionsTool};
pub use ocsf::{DefaultOcsfVersionTool, OcsfEntityTool, OcsfEventClassesTool, OcsfVersionsTool};
pub use pipeline::{ExecutePipelineTool, ValidatePipelineTool};
pub use registry::{
    json_schema_number, json_schema_object, json_schema_string, Tool, ToolRegistry,
};
