use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Typed view of the `MarketingPlan` tool arguments.
///
/// Every field is optional on the wire; models routinely omit sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingPlan {
    pub business_overview: BusinessOverview,
    pub competitor_insights: Vec<CompetitorInsight>,
    pub recommended_channels: Vec<String>,
    pub budget_allocation: BTreeMap<String, f64>,
    pub suggested_ad_creatives: Vec<SuggestedAdCreative>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessOverview {
    pub industry: String,
    pub products: Vec<String>,
    pub target_audience: String,
    pub existing_marketing: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorInsight {
    pub competitor_name: String,
    pub ad_platforms: Vec<String>,
    pub audience: String,
    pub budget_estimate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedAdCreative {
    pub platform: String,
    pub ad_type: String,
    pub creative: String,
}

impl MarketingPlan {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// JSON schema used for the `MarketingPlan` tool parameters
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "business_overview": {
                    "type": "object",
                    "properties": {
                        "industry": { "type": "string" },
                        "products": { "type": "array", "items": { "type": "string" } },
                        "target_audience": { "type": "string" },
                        "existing_marketing": { "type": "string" }
                    }
                },
                "competitor_insights": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "competitor_name": { "type": "string" },
                            "ad_platforms": { "type": "array", "items": { "type": "string" } },
                            "audience": { "type": "string" },
                            "budget_estimate": { "type": "string" }
                        }
                    }
                },
                "recommended_channels": { "type": "array", "items": { "type": "string" } },
                "budget_allocation": {
                    "type": "object",
                    "additionalProperties": { "type": "number" }
                },
                "suggested_ad_creatives": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "platform": { "type": "string" },
                            "ad_type": { "type": "string" },
                            "creative": { "type": "string" }
                        }
                    }
                }
            }
        })
    }

    /// Plain-text rendering for terminals and logs
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let overview = &self.business_overview;

        out.push_str("Business overview\n");
        push_field(&mut out, "Industry", &overview.industry);
        push_field(&mut out, "Products", &overview.products.join(", "));
        push_field(&mut out, "Target audience", &overview.target_audience);
        push_field(&mut out, "Existing marketing", &overview.existing_marketing);

        if !self.competitor_insights.is_empty() {
            out.push_str("\nCompetitors\n");
            for c in &self.competitor_insights {
                out.push_str(&format!("  - {}", c.competitor_name));
                if !c.ad_platforms.is_empty() {
                    out.push_str(&format!(" ({})", c.ad_platforms.join(", ")));
                }
                if !c.budget_estimate.is_empty() {
                    out.push_str(&format!(", budget {}", c.budget_estimate));
                }
                out.push('\n');
            }
        }

        if !self.recommended_channels.is_empty() {
            out.push_str("\nRecommended channels: ");
            out.push_str(&self.recommended_channels.join(", "));
            out.push('\n');
        }

        if !self.budget_allocation.is_empty() {
            out.push_str("\nBudget allocation\n");
            for (channel, amount) in &self.budget_allocation {
                out.push_str(&format!("  - {}: {}\n", channel, amount));
            }
        }

        if !self.suggested_ad_creatives.is_empty() {
            out.push_str("\nAd creatives\n");
            for ad in &self.suggested_ad_creatives {
                out.push_str(&format!("  - [{} / {}] {}\n", ad.platform, ad.ad_type, ad.creative));
            }
        }

        out
    }
}

fn push_field(out: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        out.push_str(&format!("  {}: {}\n", label, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_plan_is_accepted() {
        let plan = MarketingPlan::from_value(&json!({
            "business_overview": { "industry": "Coffee roasting" },
            "budget_allocation": { "Meta": 600, "Google": 400.5 }
        }))
        .unwrap();

        assert_eq!(plan.business_overview.industry, "Coffee roasting");
        assert!(plan.competitor_insights.is_empty());
        assert_eq!(plan.budget_allocation["Google"], 400.5);
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        assert!(MarketingPlan::from_value(&json!({ "recommended_channels": "Meta" })).is_err());
    }

    #[test]
    fn test_summary_mentions_sections() {
        let plan = MarketingPlan {
            recommended_channels: vec!["Google Ads".into(), "Instagram".into()],
            suggested_ad_creatives: vec![SuggestedAdCreative {
                platform: "Instagram".into(),
                ad_type: "Reel".into(),
                creative: "Behind the roast".into(),
            }],
            ..Default::default()
        };

        let summary = plan.summary();
        assert!(summary.contains("Recommended channels: Google Ads, Instagram"));
        assert!(summary.contains("[Instagram / Reel] Behind the roast"));
    }
}
