use serde::{Deserialize, Serialize};

use crate::tools::ToolRef;

pub const RESEARCH_TASK_ID: &str = "researcher";
pub const WRITING_TASK_ID: &str = "writer";

const ANALYST_BACKSTORY: &str = "You are an expert analyst at a top-tier venture capital firm. \
    You have a knack for finding hidden gems and identifying red flags in financial data. \
    You never rely on surface-level news; you always dig for the original source. \
    Your research is factual, data-driven, and always cites sources.";

const OFFICER_BACKSTORY: &str = "You are a renowned financial writer known for simplifying \
    complex tech and financial concepts. You take raw research data and transform it into \
    clear, concise, and actionable insights. Your writing style is professional, objective, \
    and easy to read.";

const RESEARCH_TASK_TEMPLATE: &str = r#"Conduct comprehensive research on: {topic}

Your task:
1. Search for the latest news, articles, and reports about this topic
2. Identify and read the top 3-5 most relevant and authoritative sources
3. Extract key information including:
   - Recent developments and innovations
   - Market trends and sentiment
   - Financial performance (if applicable)
   - Potential risks and red flags
   - Competitive landscape
4. Compile your findings with proper source citations
5. Focus on factual, data-driven insights

Remember: Always cite your sources and dig deeper than surface-level news."#;

const RESEARCH_EXPECTED_OUTPUT: &str = r#"A detailed research report containing:
- Summary of key findings with source citations
- Market trends and sentiment analysis
- Risk factors and red flags identified
- Data-driven insights and observations
- List of all sources consulted"#;

const WRITING_TASK_TEMPLATE: &str = r#"Transform the research findings about '{topic}' into a professional investment report in Markdown format.

Your task:
1. Review all research data provided by the Senior Research Analyst
2. Create a structured report with the following sections:
   - **Executive Summary**: A concise overview (3-4 paragraphs)
   - **Key Findings**: Bullet points of the most important insights
   - **Market Analysis**: Detailed analysis of trends and opportunities
   - **Risk Assessment**: Potential concerns and red flags
   - **Conclusion**: Final recommendation or summary
3. Write in a clear, professional, and objective tone
4. Make complex concepts accessible to investors
5. Include relevant data and citations from the research

The report should be actionable and decision-ready for investors."#;

const WRITING_EXPECTED_OUTPUT: &str = r#"A professional Markdown-formatted investment report with:
- Executive Summary
- Key Findings section
- Detailed Market Analysis
- Risk Assessment
- Clear Conclusion with actionable insights
- Proper formatting and structure"#;

/// Immutable description of one agent: persona, tool wiring, and model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub tools: Vec<ToolRef>,
    pub verbose: bool,
    pub allow_delegation: bool,
    pub model: String,
}

impl AgentDescriptor {
    /// The Senior Market Research Analyst. The only agent wired with tools.
    pub fn research_analyst(model: &str) -> Self {
        Self {
            role: "Senior Market Research Analyst".to_string(),
            goal: "Uncover cutting-edge developments and detailed market sentiment regarding the user's topic.".to_string(),
            backstory: ANALYST_BACKSTORY.to_string(),
            tools: vec![ToolRef::Search, ToolRef::Scrape],
            verbose: true,
            allow_delegation: false,
            model: model.to_string(),
        }
    }

    /// The Chief Content Officer. Writes the final report from findings alone.
    pub fn content_officer(model: &str) -> Self {
        Self {
            role: "Chief Content Officer".to_string(),
            goal: "Synthesize complex data into a compelling executive summary for investors.".to_string(),
            backstory: OFFICER_BACKSTORY.to_string(),
            tools: Vec::new(),
            verbose: true,
            allow_delegation: false,
            model: model.to_string(),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\n\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }
}

/// Immutable description of one unit of agent work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    pub description: String,
    pub expected_output: String,
    pub agent: AgentDescriptor,
    /// ID of a prior task whose output feeds this one.
    pub context: Option<String>,
}

impl TaskDescriptor {
    pub fn research(agent: AgentDescriptor, topic: &str) -> Self {
        Self {
            id: RESEARCH_TASK_ID.to_string(),
            description: RESEARCH_TASK_TEMPLATE.replace("{topic}", topic),
            expected_output: RESEARCH_EXPECTED_OUTPUT.to_string(),
            agent,
            context: None,
        }
    }

    pub fn writing(agent: AgentDescriptor, topic: &str, research: &TaskDescriptor) -> Self {
        Self {
            id: WRITING_TASK_ID.to_string(),
            description: WRITING_TASK_TEMPLATE.replace("{topic}", topic),
            expected_output: WRITING_EXPECTED_OUTPUT.to_string(),
            agent,
            context: Some(research.id.clone()),
        }
    }
}
