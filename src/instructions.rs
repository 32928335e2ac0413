//! Assistant instructions, including the trailing JSON block protocol.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::tools::AgentTask;
use crate::types::BLOCK_SENTINEL;

/// An agent whose tasks are exposed to the assistant as tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub tasks: Vec<AgentTask>,
}

/// General guidelines plus the structured block protocol.
pub fn base_instructions() -> String {
    format!(
        r#"You are a helpful assistant that runs tasks based on the user prompt

MAIN GUIDELINES

- Apply your best judgment to decide which tasks to run, if one or more tasks look like they do the same pick a single one
- To answer questions give preference to tasks that don't generate files unless the user specifically asks for them
- If the task response includes file paths append them to the end of your response as described in the json block instructions below
- For math formulas use syntax supported by KaTeX and use $$ as delimiter

JSON BLOCK INSTRUCTIONS

- At the end of every response append a JSON block surrounded by {s} like this:
{s}
{{
  "files": [
    {{
      "name": "file",
      "path": "/some/path/file",
      "mimeType": "a mime type"
    }}
  ]
}}
{s}
- For any given file, the file name must be a meaningful name based on the context and if the file extension doesn't match the mime type change the extension accordingly
- Do not surround the JSON block with code fences, write it exactly as the example above
- Do not mention anything about the JSON block in your response
"#,
        s = BLOCK_SENTINEL
    )
}

/// Base instructions, an agent tools section when `agents` is non-empty, then `extra`.
pub fn build_instructions(agents: &[AgentInfo], extra: Option<&str>) -> String {
    let mut out = base_instructions();

    if !agents.is_empty() {
        out.push_str(
            "\nAGENT TOOLS INSTRUCTIONS\n\n\
             - The function tools you have available belong to a set of agents\n\
             - The following is each agent's specific tools, instructions and domain information that will help you understand how to use the data its functions return\n\
             - Prefer existing tools; pick the most suitable agent based on its instructions when several could apply\n",
        );
        for agent in agents {
            agent_section(&mut out, agent);
        }
    }

    if let Some(extra) = extra.map(str::trim).filter(|e| !e.is_empty()) {
        out.push('\n');
        out.push_str(extra);
        out.push('\n');
    }
    out
}

fn agent_section(out: &mut String, agent: &AgentInfo) {
    // Writing to a String cannot fail.
    let _ = write!(
        out,
        "\nAGENT {}\n\n  ID: {}\n\n  Instructions:\n\n    {}\n  Tools:\n",
        agent.name,
        agent.id,
        agent.instructions.trim()
    );
    for task in &agent.tasks {
        let _ = writeln!(out, "    - {}_{}", agent.id, task.name);
    }
}
