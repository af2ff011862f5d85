//! Prompt assembly for the analysis requests
//!
//! The completion endpoint is asked to answer in strict JSON matching the
//! typed result shapes; the analyzer strips any code-fence markup before
//! parsing.

use super::llm::ChatMessage;
use super::AnalysisInput;

/// System prompt for comprehensive analysis
const SYSTEM_COMPREHENSIVE: &str = "You are an expert in software architecture and research \
analysis. Provide detailed, technical insights.";

/// System prompt for integration analysis
const SYSTEM_INTEGRATION: &str =
    "You are an expert in software architecture validation and framework integration.";

/// System prompt for findings synthesis
const SYSTEM_SUMMARY: &str = "You are a research synthesis expert.";

/// Builds the conversation for a comprehensive paper analysis
pub fn comprehensive(input: &AnalysisInput) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Analyze the following academic paper and provide a comprehensive analysis:

Title: {title}

Abstract: {abstract_text}

Please provide:
1. **Key Contributions**: Main contributions and innovations
2. **Technical Approach**: Methods, algorithms, or techniques used
3. **Strengths**: What makes this work valuable
4. **Limitations**: Potential weaknesses or gaps
5. **Relevance Score** (1-10): How relevant is this to software architecture validation
6. **Integration Opportunities**: Specific ways this could integrate with an automated architecture validation platform

Format your response as JSON with the following structure:
{{
  "key_contributions": ["contribution1", "contribution2", ...],
  "technical_approach": "description",
  "strengths": ["strength1", "strength2", ...],
  "limitations": ["limitation1", "limitation2", ...],
  "relevance_score": <number>,
  "integration_opportunities": ["opportunity1", "opportunity2", ...],
  "summary": "brief summary"
}}"#,
        title = input.title,
        abstract_text = input.abstract_text,
    );

    vec![
        ChatMessage::system(SYSTEM_COMPREHENSIVE),
        ChatMessage::user(prompt),
    ]
}

/// Builds the conversation for a platform-integration analysis
pub fn integration(input: &AnalysisInput) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Given the following academic paper, identify specific integration points with an automated software architecture validation platform.

Platform context:
- Validates software architectures against quality attributes
- Uses AI/ML for pattern recognition and anomaly detection
- Provides automated architecture analysis and recommendations
- Supports multiple architecture styles and views

Paper:
Title: {title}
Abstract: {abstract_text}

Provide specific integration recommendations in JSON format:
{{
  "validation_techniques": ["technique1", "technique2"],
  "ai_ml_applications": ["application1", "application2"],
  "architecture_patterns": ["pattern1", "pattern2"],
  "quality_attributes": ["attribute1", "attribute2"],
  "implementation_steps": ["step1", "step2"],
  "expected_benefits": ["benefit1", "benefit2"],
  "challenges": ["challenge1", "challenge2"],
  "priority": "high|medium|low"
}}"#,
        title = input.title,
        abstract_text = input.abstract_text,
    );

    vec![
        ChatMessage::system(SYSTEM_INTEGRATION),
        ChatMessage::user(prompt),
    ]
}

/// Builds the conversation for a cross-paper findings summary
///
/// `analyses_json` is the serialized batch of analysis outcomes.
pub fn summary(analyses_json: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Summarize the following research paper analyses into a cohesive overview:

{analyses_json}

Provide:
1. **Overall Themes**: Common themes across papers
2. **Key Insights**: Most important technical insights
3. **Research Gaps**: Areas that need more investigation
4. **Recommendations**: Prioritized recommendations for platform integration

Format as JSON:
{{
  "overall_themes": ["theme1", "theme2"],
  "key_insights": ["insight1", "insight2"],
  "research_gaps": ["gap1", "gap2"],
  "recommendations": [{{
    "priority": "high|medium|low",
    "title": "recommendation title",
    "description": "detailed description"
  }}]
}}"#
    );

    vec![ChatMessage::system(SYSTEM_SUMMARY), ChatMessage::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::llm::ChatRole;

    fn sample_input() -> AnalysisInput {
        AnalysisInput {
            paper_id: "p1".to_string(),
            title: "Microservice Decomposition".to_string(),
            abstract_text: "We present a decomposition technique.".to_string(),
        }
    }

    #[test]
    fn test_comprehensive_prompt_carries_paper_text() {
        let messages = comprehensive(&sample_input());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
        assert!(messages[1].content.contains("Microservice Decomposition"));
        assert!(messages[1]
            .content
            .contains("We present a decomposition technique."));
        assert!(messages[1].content.contains("\"relevance_score\""));
    }

    #[test]
    fn test_integration_prompt_requests_priority() {
        let messages = integration(&sample_input());

        assert!(messages[1].content.contains("\"priority\""));
        assert!(messages[1].content.contains("\"validation_techniques\""));
        assert!(messages[1].content.contains("Microservice Decomposition"));
    }

    #[test]
    fn test_summary_prompt_embeds_analyses() {
        let messages = summary(r#"[{"status": "analysis"}]"#);

        assert!(messages[1].content.contains(r#"[{"status": "analysis"}]"#));
        assert!(messages[1].content.contains("\"research_gaps\""));
    }
}
