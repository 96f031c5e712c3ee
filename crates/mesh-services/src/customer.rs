//! Customer service agent.

use crate::context::ServiceContext;
use crate::{money, plus_months};
use chrono::Days;
use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError, ParamKind};
use mesh_registry::ActionRegistry;

pub const AGENT_ID: &str = "customer";

fn inquiry_response(inquiry_type: &str) -> &'static str {
    match inquiry_type.to_lowercase().as_str() {
        "policy" => {
            "Your policy information has been retrieved. You have 3 active policies with total \
             coverage of $850,000. Would you like details on a specific policy?"
        }
        "claim" => {
            "I can help you with your claim. Please provide your claim number, or I can look up \
             recent claims on your account."
        }
        "payment" => {
            "Your last payment of $291.67 was received on Jan 15, 2026. Next payment due: \
             Feb 15, 2026. Would you like to make a payment now?"
        }
        "coverage" => {
            "I can review your current coverage and suggest any gaps. Your current policies \
             include Life, Auto, and Home insurance."
        }
        _ => {
            "Thank you for your inquiry. A customer service representative will review your \
             question and respond within 24 hours."
        }
    }
}

pub fn registry(ctx: &ServiceContext) -> Result<ActionRegistry, MeshError> {
    let mut registry = ActionRegistry::new(AGENT_ID);

    registry.register(
        ActionDescriptor::new("getCustomerAccount", "Get customer account information")
            .param("customerId", ParamKind::String),
        |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Customer Account Information\n\
                 Customer ID: {}\n\
                 =================================\n\
                 Name: John Doe\n\
                 Email: john.doe@email.com\n\
                 Phone: (555) 123-4567\n\
                 Address: 123 Main St, Springfield, IL 62701\n\
                 Date of Birth: 1984-05-15\n\
                 Customer Since: 2020-03-10\n\
                 Account Status: ACTIVE\n\
                 Preferred Contact: Email\n\
                 Active Policies: 3\n\
                 Total Premium: $3,500/year",
                args.str("customerId")?
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("updateCustomerInfo", "Update customer information")
            .param("customerId", ParamKind::String)
            .param("field", ParamKind::String)
            .param("newValue", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Customer information updated successfully.\n\
                 Customer ID: {}\n\
                 Field Updated: {}\n\
                 New Value: {}\n\
                 Update Date: {}\n\
                 Status: CONFIRMED",
                args.str("customerId")?,
                args.str("field")?,
                args.str("newValue")?,
                c.timestamp()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("handleInquiry", "Handle customer inquiry")
            .param("customerId", ParamKind::String)
            .param("inquiryType", ParamKind::String)
            .param("question", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let inquiry_type = args.str("inquiryType")?;
            Ok(ActionOutput::text(format!(
                "Customer Inquiry Response\n\
                 Customer ID: {}\n\
                 =================================\n\
                 Inquiry Type: {}\n\
                 Question: {}\n\n\
                 Response:\n{}\n\n\
                 Ticket Number: {}\n\
                 Agent: Virtual Assistant\n\
                 Response Time: {}",
                args.str("customerId")?,
                inquiry_type,
                args.str("question")?,
                inquiry_response(inquiry_type),
                c.next_id("TKT"),
                c.timestamp()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("scheduleAppointment", "Schedule appointment with agent")
            .param("customerId", ParamKind::String)
            .param("appointmentType", ParamKind::String)
            .param("preferredDate", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Appointment Scheduled Successfully\n\
                 =================================\n\
                 Customer ID: {}\n\
                 Appointment Type: {}\n\
                 Date: {}\n\
                 Time: 2:00 PM\n\
                 Duration: 45 minutes\n\
                 Agent: Sarah Johnson\n\
                 Location: Virtual Meeting\n\
                 Confirmation Number: {}\n\
                 Reminder: You will receive email and SMS reminders 24 hours before",
                args.str("customerId")?,
                args.str("appointmentType")?,
                args.str("preferredDate")?,
                c.next_id("APT")
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("generateDocuments", "Generate policy documents")
            .param("policyNumber", ParamKind::String)
            .param("documentType", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let document_id = c.next_id("DOC");
            Ok(ActionOutput::text(format!(
                "Document Generation Request\n\
                 =================================\n\
                 Policy Number: {}\n\
                 Document Type: {}\n\
                 Generation Status: COMPLETED\n\
                 Document ID: {}\n\
                 Generated Date: {}\n\
                 Download Link: https://insurance.com/docs/download/{}\n\
                 Valid Until: {}\n\
                 Format: PDF\n\
                 Note: Document will be sent to your registered email address",
                args.str("policyNumber")?,
                args.str("documentType")?,
                document_id,
                c.timestamp(),
                document_id,
                c.today() + Days::new(30)
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("processPayment", "Process customer payment")
            .param("customerId", ParamKind::String)
            .param("policyNumber", ParamKind::String)
            .param("amount", ParamKind::Decimal)
            .param("paymentMethod", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let amount = args.f64("amount")?;
            if amount <= 0.0 {
                return Err(MeshError::argument("amount", "must be positive"));
            }
            let next_due = plus_months(c.today(), 1)
                .ok_or_else(|| MeshError::Internal("date out of range".to_string()))?;
            Ok(ActionOutput::text(format!(
                "Payment Processed Successfully\n\
                 =================================\n\
                 Customer ID: {}\n\
                 Policy Number: {}\n\
                 Payment Amount: {}\n\
                 Payment Method: {}\n\
                 Confirmation Number: {}\n\
                 Transaction Date: {}\n\
                 Next Payment Due: {}\n\
                 Status: COMPLETED\n\
                 Receipt sent to registered email address",
                args.str("customerId")?,
                args.str("policyNumber")?,
                money(amount),
                args.str("paymentMethod")?,
                c.next_id("PAY"),
                c.timestamp(),
                next_due
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("submitFeedback", "Submit customer feedback")
            .param("customerId", ParamKind::String)
            .param("rating", ParamKind::Integer)
            .param("comments", ParamKind::String),
        move |args: &Arguments| -> Result<ActionOutput, MeshError> {
            let rating = args.i64("rating")?;
            if !(1..=5).contains(&rating) {
                return Err(MeshError::argument("rating", "must be between 1 and 5"));
            }
            Ok(ActionOutput::text(format!(
                "Thank you for your feedback!\n\
                 =================================\n\
                 Feedback ID: {}\n\
                 Customer ID: {}\n\
                 Rating: {}/5 stars\n\
                 Comments: {}\n\
                 Submission Date: {}\n\
                 Status: RECEIVED\n\
                 Thank you for helping us improve our service!",
                c.next_id("FDB"),
                args.str("customerId")?,
                rating,
                args.str("comments")?,
                c.timestamp()
            )))
        },
    )?;

    let c = ctx.clone();
    registry.register(
        ActionDescriptor::new("checkServiceStatus", "Check service availability"),
        move |_: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(format!(
                "Insurance Services Status\n\
                 =================================\n\
                 Policy Management: OPERATIONAL\n\
                 Claims Processing: OPERATIONAL\n\
                 Underwriting: OPERATIONAL\n\
                 Payment Gateway: OPERATIONAL\n\
                 Customer Portal: OPERATIONAL\n\
                 Phone Support: OPERATIONAL (24/7)\n\
                 Email Support: OPERATIONAL (Response within 4 hours)\n\
                 Live Chat: OPERATIONAL (9 AM - 6 PM EST)\n\
                 Last Update: {}",
                c.timestamp()
            )))
        },
    )?;

    registry.register(
        ActionDescriptor::new("getSupportOptions", "Get customer support options"),
        |_: &Arguments| -> Result<ActionOutput, MeshError> {
            Ok(ActionOutput::text(
                "Customer Support Options\n\
                 =================================\n\n\
                 1. PHONE SUPPORT\n   \
                    General Inquiries: 1-800-555-0100\n   \
                    Claims: 1-800-555-0200\n   \
                    Roadside Assistance: 1-800-555-0300\n   \
                    Hours: 24/7\n\n\
                 2. ONLINE SUPPORT\n   \
                    Customer Portal: https://insurance.com/portal\n   \
                    Live Chat: https://insurance.com/chat\n   \
                    Email: support@insurance.com\n\n\
                 3. MOBILE APP\n   \
                    Features: Policy management, claims, payments\n\n\
                 4. IN-PERSON\n   \
                    Find an office: https://insurance.com/locations\n\n\
                 5. EMERGENCY SUPPORT\n   \
                    24/7 Emergency Claims: 1-800-555-9999",
            ))
        },
    )?;

    tracing::debug!(agent = AGENT_ID, actions = registry.len(), "Registered customer actions");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;

    #[test]
    fn inquiry_type_selects_canned_response() {
        let out = registry(&test_context())
            .unwrap()
            .invoke(
                "handleInquiry",
                &Arguments::new()
                    .with("customerId", "CUST-1")
                    .with("inquiryType", "Payment")
                    .with("question", "when is my next payment due"),
            )
            .unwrap()
            .as_text();
        assert!(out.contains("Your last payment of $291.67"));
        assert!(out.contains("Ticket Number: TKT-00001"));
    }

    #[test]
    fn feedback_rating_is_bounded() {
        let err = registry(&test_context())
            .unwrap()
            .invoke(
                "submitFeedback",
                &Arguments::new()
                    .with("customerId", "CUST-1")
                    .with("rating", 9i64)
                    .with("comments", "great"),
            )
            .unwrap_err();
        assert!(matches!(err, MeshError::ArgumentError { ref parameter, .. } if parameter == "rating"));
    }

    #[test]
    fn parameterless_actions_need_no_arguments() {
        let registry = registry(&test_context()).unwrap();
        let out = registry
            .invoke("checkServiceStatus", &Arguments::new())
            .unwrap()
            .as_text();
        assert!(out.contains("Last Update: 2026-03-01 09:30:00"));
        assert!(registry.invoke("getSupportOptions", &Arguments::new()).is_ok());
    }
}
