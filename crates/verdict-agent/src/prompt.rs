use serde_json::Value;

/// Ten-point case analysis request, answered as JSON.
pub fn analysis_prompt(case_data: &Value) -> String {
    format!(
        r#"Analyze the following legal case:
{case}

Provide the following information:
1. A timeline of key events (at least 5 events)
2. Applicable laws for each event
3. Relevant case citations for each event (at least one per event)
4. Entities involved and their relationships
5. A preliminary judgment based on the information provided
6. Potential future outcomes
7. Confidence level in the analysis (considering completeness of information)
8. Suggestions for additional information needed for a more accurate analysis
9. Comparison to similar historical cases (if any)
10. Potential challenges or counterarguments to the preliminary judgment

Format your response as JSON with the following structure:
{{
    "timeline": [
        {{
            "event": "Event description",
            "date": "YYYY-MM-DD",
            "applicable_law": "Law description",
            "case_citations": ["Case citation 1", "Case citation 2"]
        }}
    ],
    "entities": [
        {{"name": "Entity name", "type": "Entity type (e.g., Person, Organization)"}}
    ],
    "entity_relationships": [
        {{"source": "Entity1", "target": "Entity2", "relationship": "Description of relationship"}}
    ],
    "preliminary_judgment": "Your preliminary judgment",
    "potential_outcomes": ["Outcome 1", "Outcome 2", "Outcome 3"],
    "confidence_level": "High/Medium/Low",
    "additional_info_needed": ["Information 1", "Information 2"],
    "similar_cases": [
        {{
            "case_name": "Name of similar case",
            "key_similarities": ["Similarity 1", "Similarity 2"],
            "outcome": "Outcome of similar case"
        }}
    ],
    "potential_challenges": ["Challenge 1", "Challenge 2"]
}}
"#,
        case = case_data
    )
}

/// Validity assessment request. The reply is expected as
/// `Validity: VALID|INVALID` followed by `Reasoning: ...`.
pub fn validity_prompt(case_description: &str) -> String {
    format!(
        r#"Given the following legal case description, analyze its validity:

{case_description}

Please provide a clear assessment of whether this case appears to be valid or not,
and briefly explain the reasoning behind your conclusion.
Your response should be in the format:

Validity: [VALID/INVALID]
Reasoning: [Your explanation]
"#
    )
}
