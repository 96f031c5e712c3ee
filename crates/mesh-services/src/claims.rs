//! Claims processing agent.

use crate::context::ServiceContext;
use crate::money;
use chrono::Days;
use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError, ParamKind};
use mesh_registry::ActionRegistry;

pub const AGENT_ID: &str = "claims";

const STATUSES: [&str; 5] = [
    "PENDING REVIEW",
    "UNDER INVESTIGATION",
    "APPROVED",
    "PAID",
    "DENIED",
];

/// Status a claim number maps to. Stable across runs and processes.
fn claim_status(claim_number: &str) -> &'static str {
    let hash = claim_number
        .chars()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32));
    STATUSES[(hash % STATUSES.len() as i32).unsigned_abs() as usize]
}

pub fn registry(ctx: &ServiceContext) -> Result<ActionRegistry, MeshError> {
    let mut registry = ActionRegistry::new(AGENT_ID);

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("submitClaim", "Submit a new insurance claim")
            .param("policyNumber", ParamKind::String)
            .param("claimType", ParamKind::String)
            .param("claimAmount", ParamKind::Decimal)
            .optional("description", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let amount = args.f64("claimAmount")?;
            if amount <= 0.0 {
                return Err(MeshError::argument("claimAmount", "must be positive"));
            }
            Ok(ActionOutput::text(format!(
                "Claim submitted successfully!\n\
                 Claim Number: {}\n\
                 Policy Number: {}\n\
                 Claim Type: {}\n\
                 Claim Amount: {}\n\
                 Description: {}\n\
                 Status: PENDING REVIEW\n\
                 Submitted: {}\n\
                 Expected Processing Time: 5-7 business days",
                c.next_id("CLM"),
                args.str("policyNumber")?,
                args.str("claimType")?,
                money(amount),
                args.str_or("description", "Not provided")?,
                c.timestamp()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("getClaimStatus", "Get claim status")
            .param("claimNumber", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let claim_number = args.str("claimNumber")?;
            let status = claim_status(claim_number);
            let notes = match status {
                "APPROVED" => "All documentation verified. Payment processing initiated.",
                "DENIED" => "Claim does not meet policy coverage criteria.",
                _ => "Claim is being reviewed by our team.",
            };
            Ok(ActionOutput::text(format!(
                "Claim Status for {}:\n\
                 =================================\n\
                 Current Status: {}\n\
                 Claim Amount: $5,000.00\n\
                 Submitted Date: 2026-01-15\n\
                 Last Updated: {}\n\
                 Assigned Adjuster: Sarah Johnson\n\
                 Notes: {}",
                claim_number,
                status,
                c.today(),
                notes
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("approveClaim", "Approve a claim")
            .param("claimNumber", ParamKind::String)
            .param("approvedAmount", ParamKind::Decimal),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let today = c.today();
            Ok(ActionOutput::text(format!(
                "Claim {} has been APPROVED.\n\
                 Approved Amount: {}\n\
                 Approval Date: {}\n\
                 Payment Method: Direct Deposit\n\
                 Expected Payment Date: {}\n\
                 Status: APPROVED - PAYMENT PENDING",
                args.str("claimNumber")?,
                money(args.f64("approvedAmount")?),
                today,
                today + Days::new(3)
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("denyClaim", "Deny a claim")
            .param("claimNumber", ParamKind::String)
            .param("reason", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Claim {} has been DENIED.\n\
                 Reason: {}\n\
                 Denial Date: {}\n\
                 Status: DENIED\n\
                 Appeal Information: You may appeal this decision within 30 days.",
                args.str("claimNumber")?,
                args.str("reason")?,
                c.today()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new(
            "requestDocumentation",
            "Request additional documentation for a claim",
        )
        .param("claimNumber", ParamKind::String)
        .param("documentsNeeded", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Additional documentation requested for Claim {}:\n\
                 Documents Required:\n{}\n\
                 Deadline: {}\n\
                 Submission Method: Upload to customer portal or email to claims@insurance.com\n\
                 Status: PENDING DOCUMENTATION",
                args.str("claimNumber")?,
                args.str("documentsNeeded")?,
                c.today() + Days::new(10)
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("calculateClaimPayout", "Calculate claim payout amount")
            .param("claimNumber", ParamKind::String)
            .param("claimAmount", ParamKind::Decimal)
            .param("deductible", ParamKind::Decimal)
            .param("coveragePercentage", ParamKind::Decimal),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let amount = args.f64("claimAmount")?;
            let deductible = args.f64("deductible")?;
            let percentage = args.f64("coveragePercentage")?;
            if !(0.0..=100.0).contains(&percentage) {
                return Err(MeshError::argument(
                    "coveragePercentage",
                    "must be between 0 and 100",
                ));
            }
            let payout = ((amount - deductible) * percentage / 100.0).max(0.0);

            Ok(ActionOutput::text(format!(
                "Claim Payout Calculation for {}:\n\
                 =================================\n\
                 Total Claim Amount: {}\n\
                 Policy Deductible: {}\n\
                 Coverage Percentage: {:.0}%\n\
                 Eligible Amount: {}\n\
                 Final Payout Amount: {}",
                args.str("claimNumber")?,
                money(amount),
                money(deductible),
                percentage,
                money(amount - deductible),
                money(payout)
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("getClaimsSummary", "Get claims summary for a policy")
            .param("policyNumber", ParamKind::String),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Claims Summary for Policy {}:\n\n\
                 Total Claims: 3\n\
                 Approved: 2 ($8,500)\n\
                 Denied: 0\n\
                 Pending: 1 ($5,000)\n\n\
                 Recent Claims:\n\
                 1. CLM-12345 - Medical - $3,500 - PAID\n\
                 2. CLM-12346 - Auto Accident - $5,000 - PAID\n\
                 3. CLM-12347 - Property Damage - $5,000 - PENDING REVIEW",
                args.str("policyNumber")?
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("processPayment", "Process claim payment")
            .param("claimNumber", ParamKind::String)
            .param("amount", ParamKind::Decimal)
            .param("paymentMethod", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Payment processed for Claim {}:\n\
                 Transaction ID: {}\n\
                 Payment Amount: {}\n\
                 Payment Method: {}\n\
                 Processing Date: {}\n\
                 Status: COMPLETED",
                args.str("claimNumber")?,
                c.next_id("TXN"),
                money(args.f64("amount")?),
                args.str("paymentMethod")?,
                c.timestamp()
            )))
        },
    )?;

    tracing::debug!(agent = AGENT_ID, actions = registry.len(), "Registered claims actions");
    Ok(registry)
}
