//! `mesh actions`, `mesh ask` and `mesh pipeline`.

use anyhow::Result;
use mesh_core::MergeStrategy;
use mesh_runtime::{CancelSignal, ExecutionMode, Mesh, PipelineError, RunOptions};

pub async fn actions(mesh: &Mesh) {
    let entries = mesh.list_actions().await;
    println!("{} actions:\n", entries.len());
    for entry in entries {
        let params = entry
            .descriptor
            .parameters
            .iter()
            .map(|p| {
                let mark = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, mark, p.kind.json_type())
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}({})  [{}]", entry.action, params, entry.status);
        println!("      {}", entry.descriptor.description);
    }
}

pub async fn ask(mesh: &Mesh, text: &str, explain: bool) -> Result<()> {
    if explain {
        print!("{}", mesh.explain(text).await);
        return Ok(());
    }

    let invocation = mesh.resolve_and_invoke(text).await?;
    println!(
        "→ {} (confidence {:.2})\n",
        invocation.call.action, invocation.call.confidence
    );
    println!("{}", invocation.output);
    Ok(())
}

pub async fn pipeline(
    mesh: &Mesh,
    text: &str,
    mode: Option<ExecutionMode>,
    merge: Option<MergeStrategy>,
) -> Result<()> {
    let options = RunOptions { mode, merge };
    match mesh
        .run_pipeline_with(text, options, &CancelSignal::never())
        .await
    {
        Ok(merged) => {
            println!("{}", merged.render());
            Ok(())
        }
        Err(PipelineError::PartialFailure {
            completed,
            failed_step,
            error,
            skipped,
        }) => {
            if !completed.is_empty() {
                println!("{}\n", completed.render());
            }
            eprintln!("Step {failed_step} failed: {error}");
            if !skipped.is_empty() {
                let skipped: Vec<String> = skipped.iter().map(ToString::to_string).collect();
                eprintln!("Not run: steps {}", skipped.join(", "));
            }
            anyhow::bail!("pipeline finished with {} of its steps", completed.len())
        }
        Err(e) => Err(e.into()),
    }
}
