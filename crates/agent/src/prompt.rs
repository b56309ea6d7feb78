//! Prompt templates for the search agent.

use webseek_core::temporal::Language;

/// Instruction prefix for the tag-based reasoning protocol.
///
/// Prepended to the first user message; the user's text follows `User: `.
pub const REACT_USER_PROMPT: &str = r#"The assistant starts with one or more cycles of (thinking about which tool to use -> performing tool call -> waiting for tool response), and ends with (thinking about the answer -> answer of the question). The thinking processes, tool calls, tool responses, and answer are enclosed within their tags. There could be multiple thinking processes, tool calls, tool call parameters and tool response parameters.

Example response:
<think> thinking process here </think>
<tool_call>
{"name": "tool name here", "arguments": {"parameter name here": parameter value here, "another parameter name here": another parameter value here, ...}}
</tool_call>
<tool_response>
tool_response here
</tool_response>
<think> thinking process here </think>
<tool_call>
{"name": "another tool name here", "arguments": {...}}
</tool_call>
<tool_response>
tool_response here
</tool_response>
(more thinking processes, tool calls and tool responses here)
<think> thinking process here </think>
<answer> answer here </answer>

User: "#;

/// Marker put in front of streamed reasoning when the model omits it.
pub const THINK_OPEN: &str = "<think>\n";

/// Where a run's system message comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemPrompt {
    /// The built-in web-seeker prompt, stamped with today's date.
    WebSeeker,
    /// A fixed prompt from configuration.
    Fixed(String),
}

impl SystemPrompt {
    /// Render the prompt for a run starting on `today`.
    pub fn render(&self, today: &str, language: Language) -> String {
        match self {
            Self::WebSeeker => web_seeker_prompt(today, language),
            Self::Fixed(text) => text.clone(),
        }
    }
}

/// The default system prompt.
pub fn web_seeker_prompt(today: &str, language: Language) -> String {
    let answer_language = match language {
        Language::Zh => "chinese",
        Language::En => "english",
    };
    format!(
        "You are a Web Information Seeking Master. Your task is to thoroughly seek the internet for information and provide accurate answers to questions. with {answer_language} language.\
         And you are also a Location-Based Services (LBS) assistant designed to help users find location-specific information.\
         No matter how complex the query, you will not give up until you find the corresponding information.\n\n\
         As you proceed, adhere to the following principles:\n\n\
         1. **Persistent Actions for Answers**: You will engage in many interactions, delving deeply into the topic to explore all possible aspects until a satisfactory answer is found.\n\n\
         2. **Repeated Verification**: Before presenting a Final Answer, you will **cross-check** and **validate the information** you've gathered to confirm its accuracy and reliability.\n\n\
         3. **Attention to Detail**: You will carefully analyze each information source to ensure that all data is current, relevant, and from credible origins.\n\n\
         Please note that the current datetime is [{today}]. When responding, consider the time to provide contextually relevant information."
    )
}

/// Prefix reasoning output with [`THINK_OPEN`] unless the model already opened it.
pub fn open_reasoning(text: &str) -> String {
    let text = text.trim();
    if text.starts_with("<think>") {
        text.to_string()
    } else {
        format!("{THINK_OPEN}{text}")
    }
}
