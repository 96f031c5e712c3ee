//! Policy management agent.

use crate::context::ServiceContext;
use crate::{money, plus_months, rate_factor};
use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError, ParamKind};
use mesh_registry::ActionRegistry;

pub const AGENT_ID: &str = "policy";

pub fn registry(ctx: &ServiceContext) -> Result<ActionRegistry, MeshError> {
    let mut registry = ActionRegistry::new(AGENT_ID);

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("createPolicy", "Create a new insurance policy")
            .param("policyType", ParamKind::String)
            .param("customerName", ParamKind::String)
            .param("coverageAmount", ParamKind::Decimal),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let policy_number = c.next_id("POL");
            Ok(ActionOutput::text(format!(
                "Policy created successfully!\n\
                 Policy Number: {}\n\
                 Policy Type: {}\n\
                 Customer: {}\n\
                 Coverage Amount: {}\n\
                 Status: ACTIVE\n\
                 Created: {}",
                policy_number,
                args.str("policyType")?,
                args.str("customerName")?,
                money(args.f64("coverageAmount")?),
                c.today()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("renewPolicy", "Renew an existing insurance policy")
            .param("policyNumber", ParamKind::String)
            .param("renewalYears", ParamKind::Integer),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let years = args.i64("renewalYears")?;
            if years < 1 {
                return Err(MeshError::argument("renewalYears", "must be at least 1"));
            }
            let expires = years
                .checked_mul(12)
                .and_then(|months| plus_months(c.today(), months))
                .ok_or_else(|| MeshError::argument("renewalYears", "too far in the future"))?;
            Ok(ActionOutput::text(format!(
                "Policy {} renewed successfully for {} year(s).\n\
                 New Expiration Date: {}\n\
                 Renewal Premium: $1,250.00\n\
                 Status: ACTIVE",
                args.str("policyNumber")?,
                years,
                expires
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("cancelPolicy", "Cancel an insurance policy")
            .param("policyNumber", ParamKind::String)
            .param("reason", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Policy {} has been cancelled.\n\
                 Reason: {}\n\
                 Cancellation Date: {}\n\
                 Refund Amount: $450.00\n\
                 Status: CANCELLED",
                args.str("policyNumber")?,
                args.str("reason")?,
                c.today()
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("getPolicyDetails", "Get policy details")
            .param("policyNumber", ParamKind::String),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Policy Details for {}:\n\
                 =================================\n\
                 Policy Type: Life Insurance\n\
                 Customer: John Doe\n\
                 Coverage Amount: $500,000\n\
                 Premium: $1,250/year\n\
                 Start Date: 2025-01-01\n\
                 Expiration Date: 2045-01-01\n\
                 Status: ACTIVE\n\
                 Beneficiaries: Jane Doe, Robert Doe",
                args.str("policyNumber")?
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("updatePolicy", "Update policy information")
            .param("policyNumber", ParamKind::String)
            .param("updateType", ParamKind::String)
            .param("newValue", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Policy {} updated successfully.\n\
                 Update Type: {}\n\
                 New Value: {}\n\
                 Effective Date: {}",
                args.str("policyNumber")?,
                args.str("updateType")?,
                args.str("newValue")?,
                c.today()
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("calculatePremium", "Calculate premium for a policy")
            .param("policyType", ParamKind::String)
            .param("age", ParamKind::Integer)
            .param("coverageAmount", ParamKind::Decimal)
            .param("riskCategory", ParamKind::String),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let age = args.i64("age")?;
            let coverage = args.f64("coverageAmount")?;
            let risk = args.str("riskCategory")?;

            let base = coverage * 0.0025;
            let age_factor = if age > 50 { 1.5 } else { 1.0 };
            let risk_factor = rate_factor(risk);
            let total = base * age_factor * risk_factor;

            Ok(ActionOutput::text(format!(
                "Premium Calculation:\n\
                 =================================\n\
                 Policy Type: {}\n\
                 Coverage Amount: {}\n\
                 Base Premium: {}\n\
                 Age Factor (Age {}): {:.2}x\n\
                 Risk Category: {} ({:.2}x)\n\
                 Annual Premium: {}\n\
                 Monthly Premium: {}",
                args.str("policyType")?,
                money(coverage),
                money(base),
                age,
                age_factor,
                risk,
                risk_factor,
                money(total),
                money(total / 12.0)
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("listCustomerPolicies", "List all active policies for a customer")
            .param("customerId", ParamKind::String),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Active Policies for Customer {}:\n\n\
                 1. POL-12345 - Life Insurance - $500,000 - Active\n\
                 2. POL-12346 - Auto Insurance - $50,000 - Active\n\
                 3. POL-12347 - Home Insurance - $300,000 - Active\n\
                 Total Policies: 3 | Total Annual Premium: $3,500",
                args.str("customerId")?
            )))
        },
    )?;

    tracing::debug!(agent = AGENT_ID, actions = registry.len(), "Registered policy actions");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;

    fn call(action: &str, args: Arguments) -> String {
        registry(&test_context())
            .unwrap()
            .invoke(action, &args)
            .unwrap()
            .as_text()
    }

    #[test]
    fn create_policy_mints_a_number() {
        let out = call(
            "createPolicy",
            Arguments::new()
                .with("policyType", "Life")
                .with("customerName", "John Doe")
                .with("coverageAmount", 500_000.0),
        );
        assert!(out.contains("Policy Number: POL-00001"));
        assert!(out.contains("Coverage Amount: $500,000.00"));
        assert!(out.contains("Created: 2026-03-01"));
    }

    #[test]
    fn premium_applies_age_and_risk_factors() {
        let out = call(
            "calculatePremium",
            Arguments::new()
                .with("policyType", "Life")
                .with("age", 55i64)
                .with("coverageAmount", 100_000.0)
                .with("riskCategory", "high"),
        );
        // 100000 * 0.0025 * 1.5 * 2.0
        assert!(out.contains("Annual Premium: $750.00"), "{out}");
        assert!(out.contains("Monthly Premium: $62.50"), "{out}");
    }

    #[test]
    fn renewal_moves_expiry() {
        let out = call(
            "renewPolicy",
            Arguments::new()
                .with("policyNumber", "POL-1")
                .with("renewalYears", 2i64),
        );
        assert!(out.contains("New Expiration Date: 2028-03-01"));
    }

    #[test]
    fn renewal_rejects_zero_years() {
        let err = registry(&test_context())
            .unwrap()
            .invoke(
                "renewPolicy",
                &Arguments::new()
                    .with("policyNumber", "POL-1")
                    .with("renewalYears", 0i64),
            )
            .unwrap_err();
        assert!(matches!(err, MeshError::ArgumentError { ref parameter, .. } if parameter == "renewalYears"));
    }

    #[test]
    fn renewal_rejects_unrepresentable_terms() {
        let err = registry(&test_context())
            .unwrap()
            .invoke(
                "renewPolicy",
                &Arguments::new()
                    .with("policyNumber", "POL-1")
                    .with("renewalYears", 1_000_000_000_000_000_000i64),
            )
            .unwrap_err();
        assert!(matches!(err, MeshError::ArgumentError { ref parameter, .. } if parameter == "renewalYears"));
    }

    #[test]
    fn registers_every_operation() {
        assert_eq!(registry(&test_context()).unwrap().len(), 7);
    }
}
