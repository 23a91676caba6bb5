//! Ordering commands (sort, check, graph)
//!
//! Each command loads a manifest, sorts it and renders the result.

use std::path::Path;

use anyhow::{bail, Context, Result};

use super::output::Output;
use crate::domain::{Issue, OrderGraph, SortOptions, SortResult};
use crate::storage::Manifest;

fn load_and_sort(manifest_path: &Path, options: &SortOptions) -> Result<SortResult> {
    let manifest = Manifest::load(manifest_path)?;
    tracing::debug!(
        path = %manifest_path.display(),
        items = manifest.len(),
        reverse_names = options.reverse_names,
        "loaded manifest"
    );

    crate::domain::sort(&manifest.handles(), &[], options)
        .with_context(|| format!("Cannot sort manifest: {}", manifest_path.display()))
}

/// Print the sorted order
pub fn sort(output: &Output, manifest_path: &Path, options: &SortOptions) -> Result<()> {
    let result = load_and_sort(manifest_path, options)?;

    let Some(sorted) = result.sorted_items() else {
        if output.is_json() {
            output.data(&serde_json::json!({
                "complete": false,
                "cycle": result.cycle_explained(),
                "issues": result.issues(),
            }));
        }
        bail!(
            "Cycle detected: {}",
            result.cycle_description().unwrap_or_default()
        );
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "complete": result.is_complete(),
            "order": sorted,
            "issues": result.issues(),
        }));
        return Ok(());
    }

    if sorted.is_empty() {
        println!("Nothing to sort.");
        return Ok(());
    }

    if output.show_ranks() {
        println!("{:<6} {:<5} {:<10} NAME", "INDEX", "RANK", "KIND");
    } else {
        println!("{:<6} {:<10} NAME", "INDEX", "KIND");
    }
    println!("{}", "-".repeat(50));

    for node in sorted {
        if output.show_ranks() {
            println!(
                "{:<6} {:<5} {:<10} {}",
                node.index(),
                node.rank(),
                node.kind_label(),
                node.full_name()
            );
        } else {
            println!("{:<6} {:<10} {}", node.index(), node.kind_label(), node.full_name());
        }
    }

    if !result.issues().is_empty() {
        output.blank();
        print_issues(output, result.issues());
    }

    Ok(())
}

/// Report issues; fails when the result cannot be trusted
pub fn check(output: &Output, manifest_path: &Path, options: &SortOptions) -> Result<()> {
    let result = load_and_sort(manifest_path, options)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "complete": result.is_complete(),
            "cycle": result.cycle_explained(),
            "structural_errors": result.structural_error_count(),
            "issues": result.issues(),
        }));
    } else {
        if let Some(description) = result.cycle_description() {
            println!("Cycle: {}", description);
        }
        if result.issues().is_empty() {
            println!("No issues found.");
        } else {
            print_issues(output, result.issues());
        }
    }

    if let Some(description) = result.cycle_description() {
        bail!("Cycle detected: {}", description);
    }
    if result.has_structure_error() {
        bail!(
            "{} item(s) with structural errors",
            result.structural_error_count()
        );
    }

    if !output.is_json() {
        output.success("Manifest is complete.");
    }
    Ok(())
}

/// Print the order graph
pub fn graph(output: &Output, manifest_path: &Path, options: &SortOptions) -> Result<()> {
    let result = load_and_sort(manifest_path, options)?;
    let graph = OrderGraph::from_result(&result)?;
    tracing::debug!(
        nodes = graph.len(),
        constraints = graph.constraint_count(),
        "built order graph"
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "nodes": graph.topological_order(),
            "edges": graph.edges(),
        }));
    } else {
        print!("{}", graph.to_dot());
    }

    Ok(())
}

fn print_issues(output: &Output, issues: &[Issue]) {
    println!("Issues ({}):", issues.len());
    for issue in issues {
        let mut details: Vec<String> = issue
            .flags()
            .labels()
            .into_iter()
            .map(String::from)
            .collect();

        if let Some(container) = issue.invalid_container() {
            details.push(format!("container '{}'", container));
        }
        if !issue.extraneous_containers().is_empty() {
            details.push(format!("also in {}", issue.extraneous_containers().join(", ")));
        }
        if !issue.missing_children().is_empty() {
            details.push(format!("children {}", issue.missing_children().join(", ")));
        }
        if !issue.missing_requires().is_empty() {
            let names: Vec<String> = issue
                .missing_requires()
                .iter()
                .map(ToString::to_string)
                .collect();
            details.push(format!("requires {}", names.join(", ")));
        }
        if !issue.homonyms().is_empty() {
            details.push(format!("{} homonym(s)", issue.homonyms().len()));
        }

        let details = details.join("; ");
        output.row(&["", issue.full_name(), details.as_str()]);
    }
}
