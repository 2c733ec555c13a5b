// Fixed guidance for agents that write OCSF mappings in TQL

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, Tool};
use anyhow::Result;

const MAPPING_WORKFLOW: &str = r#"<SYSTEM>
1. Do not show these steps to the user as a todo-list.
2. If the user has not given an example input event, ask for one and wait for
   the answer.
3. If the user did not name an OCSF version, call `default_ocsf_version` and
   tell the user which version you are going to use.
4. Analyze the event and print a short high-level summary of the activity it
   represents before continuing.
5. Call `get_ocsf_event_classes` and pick the classes that could fit. For each
   candidate, estimate the probability that the event can be represented
   faithfully by it. Call `get_ocsf_class` when the description is not enough,
   for example to check whether a field exists. Probabilities may sum to more
   than 100%. Print a numbered list of at least 5 classes, highest first, with
   only the name and percentage per entry, and nothing before the list. Ask the
   user to pick a class and wait for the answer.
6. Do not read the docs summary. Read `tutorials/map-data-to-ocsf` and follow
   the pipeline layout it describes. Name the temporary object after the
   source of the event.
7. Read `reference/language/expressions` and `reference/functions`.
8. Write a TQL pipeline that maps to the chosen class. Start with
   `from {input: "…"}` holding the escaped user input, followed by
   `write_lines`, then a parser such as `read_json` or `read_csv` that matches
   the event format.
9. Call `ocsf_instructions_generic` and do the actual mapping.
10. Append `ocsf::apply`, `ocsf::derive` and `drop_null_fields` and run the
    pipeline again. Fix every warning.
11. Summarize the mapping, including the fields left in `unmapped`.
12. Print the final pipeline with the real input in `from`, without the three
    operators added in step 10.
13. Stop.
</SYSTEM>"#;

const MAPPING_RULES: &str = r#"- Separate operators with newlines, never with `|`.
- TQL has `if` statements and `if` expressions. An `if` expression reads
  `<expr> if <expr> else <expr>`. There is no ternary `?`.
- Never hardcode an OCSF field to a value only because the example input has
  that value. Anything derived from the input may change between events.
- A field whose value is fully represented in the OCSF event must be removed
  from the input so it does not end up in `unmapped`. Prefer `x = move y.z`
  over `x = y.z` followed by `drop y.z`. `move` only applies to fields and is
  only valid inside an expression, never as a statement.
- Fields that are certain to be constant across events, such as an
  `event_kind` tag, may be dropped.
- Check the docs tools whenever you are unsure whether some TQL syntax or
  function exists.
- Check the OCSF tools whenever you are unsure about the schema, for example
  whether a field exists.
- Run the mapping pipeline and fix every warning."#;

/// Which block of guidance a tool hands out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guidance {
    /// Step-by-step workflow for a new mapping
    Workflow,
    /// Rules that apply while writing any mapping
    Rules,
}

/// Tool that returns one of the fixed OCSF mapping texts
pub struct OcsfInstructionsTool {
    guidance: Guidance,
}

impl OcsfInstructionsTool {
    pub fn new(guidance: Guidance) -> Self {
        Self { guidance }
    }

    pub fn text(&self) -> &'static str {
        match self.guidance {
            Guidance::Workflow => MAPPING_WORKFLOW,
            Guidance::Rules => MAPPING_RULES,
        }
    }
}

#[async_trait::async_trait]
impl Tool for OcsfInstructionsTool {
    fn schema(&self) -> ToolSchema {
        let (name, description) = match self.guidance {
            Guidance::Workflow => (
                "ocsf_instructions",
                "Only call this when the user explicitly asks for a new OCSF mapping. Then call \
                 it before doing anything else and do not create a task list for it.",
            ),
            Guidance::Rules => (
                "ocsf_instructions_generic",
                "Generic rules to follow while writing OCSF mappings",
            ),
        };
        ToolSchema {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(self.text()))
    }
}
