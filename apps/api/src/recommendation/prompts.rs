// LLM prompt constants for the recommendation engine.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for site recommendation. Enforces JSON-only output.
pub const RECOMMEND_SYSTEM: &str = "You are a public-health planning analyst who proposes \
    sites for new primary-care facilities in Rwanda from district-level access statistics. \
    You MUST respond with valid JSON only: a JSON array of site objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Site recommendation prompt template.
/// Replace: {no_fabrication_instruction}, {analysis_json}, {bounds_json}, {max_sites}
pub const RECOMMEND_PROMPT_TEMPLATE: &str = r#"{no_fabrication_instruction}

DISTRICT ANALYSIS:
{analysis_json}

DISTRICT BOUNDING BOX (every proposed site MUST lie inside it):
{bounds_json}

Propose at most {max_sites} locations for new health facilities that would bring the
district's average travel time closer to the target travel time. Prefer populated areas
that are far from existing facilities.

Return a JSON ARRAY:
[
  {
    "name": "Short descriptive site name",
    "latitude": -1.9536,
    "longitude": 30.0605,
    "facility_type": "health_center",
    "justification": "One or two sentences grounded in the figures above"
  }
]

HARD RULES:
1. `facility_type` must be exactly "health_center" or "clinic"
2. `latitude` and `longitude` are decimal degrees inside the bounding box above
3. Order the array from highest to lowest priority
4. Return [] if the figures do not justify any new facility"#;
