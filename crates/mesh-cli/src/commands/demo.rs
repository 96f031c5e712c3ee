//! `mesh demo` - the scripted insurance scenario.

use anyhow::Result;
use mesh_runtime::{Mesh, PipelineError};

const COMPLEX_QUERY: &str = "For customer CUST-12345, check their active policies, assess if they \
                             need additional coverage, and show any pending claims";

const SINGLE_QUERIES: &[(&str, &str)] = &[
    (
        "Customer Information",
        "Get customer account information for customer ID CUST-12345",
    ),
    (
        "Risk Assessment",
        "Assess risk for John Doe, 42 years old, good health, software engineer, non-smoker",
    ),
    (
        "Policy Creation",
        "Create a life insurance policy for John Doe with $500,000 coverage",
    ),
    (
        "Claim Submission",
        "Submit a medical claim for policy POL-12345, claim amount $5000, for emergency surgery",
    ),
];

pub async fn run(mesh: &Mesh) -> Result<()> {
    println!("\n=== Insurance Mesh Demo ===\n");

    for (title, query) in SINGLE_QUERIES {
        match mesh.resolve_and_invoke(query).await {
            Ok(invocation) => println!(
                "{title} [{}]:\n{}\n",
                invocation.call.action, invocation.output
            ),
            Err(e) => println!("{title}: failed: {e}\n"),
        }
    }

    // The compound request does not map to one action.
    match mesh.resolve_and_invoke(COMPLEX_QUERY).await {
        Ok(invocation) => println!(
            "Complex Query (single) [{}]:\n{}\n",
            invocation.call.action, invocation.output
        ),
        Err(e) => println!("Complex Query (single): {e}\n"),
    }

    match mesh.run_pipeline(COMPLEX_QUERY).await {
        Ok(merged) => println!("Complex Query (pipeline):\n{}\n", merged.render()),
        Err(PipelineError::PartialFailure {
            completed,
            failed_step,
            error,
            ..
        }) => {
            println!("Complex Query (pipeline, partial):\n{}\n", completed.render());
            println!("Step {failed_step} failed: {error}\n");
        }
        Err(e) => println!("Complex Query (pipeline): {e}\n"),
    }

    let chained = "check customer CUST-12345's policies and then submit a claim for $5000";
    match mesh.run_pipeline(chained).await {
        Ok(merged) => println!("Chained Request (pipeline):\n{}\n", merged.render()),
        Err(e) => println!("Chained Request (pipeline): {e}\n"),
    }

    tracing::info!("Insurance mesh demo completed");
    Ok(())
}
