//! Underwriting agent.

use crate::context::ServiceContext;
use crate::{money, rate_factor};
use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError, ParamKind};
use mesh_registry::ActionRegistry;

pub const AGENT_ID: &str = "underwriting";

/// Risk score out of 100 and its category.
pub fn risk_score(age: i64, health: &str, occupation: &str, smoker: bool) -> (i64, &'static str) {
    let mut score = 50;

    score += match age {
        a if a > 60 => 30,
        a if a > 45 => 15,
        a if a < 30 => -10,
        _ => 0,
    };

    score += match health.to_lowercase().as_str() {
        "excellent" => -20,
        "good" => -10,
        "fair" => 10,
        "poor" => 30,
        _ => 0,
    };

    if smoker {
        score += 25;
    }

    let occupation = occupation.to_lowercase();
    if occupation.contains("construction") || occupation.contains("mining") {
        score += 20;
    }

    let category = match score {
        s if s < 40 => "LOW",
        s if s < 70 => "MEDIUM",
        _ => "HIGH",
    };
    (score, category)
}

fn base_rate(policy_type: &str) -> f64 {
    match policy_type.to_lowercase().as_str() {
        "life" => 0.003,
        "auto" => 0.015,
        "home" => 0.008,
        "health" => 0.05,
        _ => 0.01,
    }
}

pub fn registry(ctx: &ServiceContext) -> Result<ActionRegistry, MeshError> {
    let mut registry = ActionRegistry::new(AGENT_ID);

    registry.register(
        ActionDescriptor::new("assessRisk", "Assess risk for an insurance application")
            .param("applicantName", ParamKind::String)
            .param("age", ParamKind::Integer)
            .param("healthStatus", ParamKind::String)
            .param("occupation", ParamKind::String)
            .param("smoker", ParamKind::Boolean),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let age = args.i64("age")?;
            if !(0..=130).contains(&age) {
                return Err(MeshError::argument("age", "out of range"));
            }
            let health = args.str("healthStatus")?;
            let occupation = args.str("occupation")?;
            let smoker = args.bool("smoker")?;
            let (score, category) = risk_score(age, health, occupation, smoker);
            let recommendation = match category {
                "LOW" => "APPROVED - Standard rates",
                "MEDIUM" => "APPROVED - Moderate premium adjustment",
                _ => "REQUIRES ADDITIONAL REVIEW - High risk premium or limited coverage",
            };

            Ok(ActionOutput::text(format!(
                "Risk Assessment for {}:\n\
                 =================================\n\
                 Age: {} years\n\
                 Health Status: {}\n\
                 Occupation: {}\n\
                 Smoker: {}\n\
                 Risk Score: {}/100\n\
                 Risk Category: {}\n\
                 Recommendation: {}",
                args.str("applicantName")?,
                age,
                health,
                occupation,
                if smoker { "Yes" } else { "No" },
                score,
                category,
                recommendation
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new(
            "calculatePremiumRate",
            "Calculate premium rate based on risk factors",
        )
        .param("policyType", ParamKind::String)
        .param("riskCategory", ParamKind::String)
        .param("coverageAmount", ParamKind::Decimal),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let policy_type = args.str("policyType")?;
            let risk = args.str("riskCategory")?;
            let coverage = args.f64("coverageAmount")?;
            let rate = base_rate(policy_type);
            let multiplier = rate_factor(risk);
            let annual = coverage * rate * multiplier;

            Ok(ActionOutput::text(format!(
                "Premium Rate Calculation:\n\
                 =================================\n\
                 Policy Type: {} Insurance\n\
                 Coverage Amount: {}\n\
                 Base Rate: {:.3}%\n\
                 Risk Category: {} ({:.1}x multiplier)\n\
                 Annual Premium: {}\n\
                 Monthly Premium: {}\n\
                 Quarterly Premium: {}",
                policy_type,
                money(coverage),
                rate * 100.0,
                risk,
                multiplier,
                money(annual),
                money(annual / 12.0),
                money(annual / 4.0)
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("evaluateEligibility", "Evaluate coverage eligibility")
            .param("applicantName", ParamKind::String)
            .param("policyType", ParamKind::String)
            .param("preExistingConditions", ParamKind::String),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let policy_type = args.str("policyType")?;
            let conditions = args.str("preExistingConditions")?;
            let restrictions = if policy_type.eq_ignore_ascii_case("health")
                && !conditions.eq_ignore_ascii_case("none")
            {
                "Pre-existing conditions excluded for first 12 months"
            } else {
                "None"
            };

            Ok(ActionOutput::text(format!(
                "Eligibility Evaluation for {}:\n\
                 =================================\n\
                 Policy Type: {}\n\
                 Pre-existing Conditions: {}\n\
                 Eligibility Status: ELIGIBLE\n\
                 Coverage Restrictions: {}\n\
                 Approval Status: APPROVED WITH CONDITIONS",
                args.str("applicantName")?,
                policy_type,
                conditions,
                restrictions
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("generateRiskReport", "Generate risk report")
            .param("applicationId", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Underwriting Risk Report\n\
                 Application ID: {}\n\
                 =================================\n\n\
                 APPLICANT PROFILE:\n\
                 Name: John Smith\n\
                 Age: 42 years\n\
                 Occupation: Software Engineer\n\n\
                 HEALTH ASSESSMENT:\n\
                 Overall Health: Good\n\
                 BMI: 24.5 (Normal)\n\
                 Blood Pressure: 120/80 (Normal)\n\
                 Medical History: No major conditions\n\n\
                 LIFESTYLE FACTORS:\n\
                 Smoker: No\n\
                 Exercise: Regular\n\n\
                 RISK ANALYSIS:\n\
                 Overall Risk Score: 45/100\n\
                 Risk Category: LOW-MEDIUM\n\n\
                 RECOMMENDATION:\n\
                 Status: APPROVED\n\
                 Premium Loading: Standard +5%\n\
                 Report Date: {}",
                args.str("applicationId")?,
                c.today()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new(
            "processApplication",
            "Approve or decline insurance application",
        )
        .param("applicationId", ParamKind::String)
        .param("decision", ParamKind::String)
        .param("reason", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let decision = args.str("decision")?.to_uppercase();
            let next_steps = if decision == "APPROVED" {
                "Policy documents will be generated and sent for signature"
            } else {
                "Applicant will be notified with appeal rights information"
            };
            Ok(ActionOutput::text(format!(
                "Application {} - {}\n\
                 =================================\n\
                 Decision: {}\n\
                 Reason: {}\n\
                 Decision Date: {}\n\
                 Underwriter: Michael Thompson\n\
                 Next Steps: {}",
                args.str("applicationId")?,
                decision,
                decision,
                args.str("reason")?,
                c.today(),
                next_steps
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("setPolicyTerms", "Set policy terms and conditions")
            .param("policyType", ParamKind::String)
            .param("termLength", ParamKind::Integer)
            .param("coverageAmount", ParamKind::Decimal),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Policy Terms Configuration:\n\
                 =================================\n\
                 Policy Type: {}\n\
                 Term Length: {} years\n\
                 Coverage Amount: {}\n\
                 Deductible: $1,000\n\
                 Co-insurance: 80/20\n\
                 Out-of-Pocket Max: $5,000/year\n\
                 Waiting Period: 30 days\n\
                 Grace Period: 30 days\n\
                 Renewal: Automatic (subject to review)\n\
                 Cancellation: 30 days notice required",
                args.str("policyType")?,
                args.i64("termLength")?,
                money(args.f64("coverageAmount")?)
            )))
        },
    )?;

    tracing::debug!(agent = AGENT_ID, actions = registry.len(), "Registered underwriting actions");
    Ok(registry)
}
