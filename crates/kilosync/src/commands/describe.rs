//! `describe`: the operator-console surface built from the device's
//! capabilities.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::Tabled;

use kilosync_core::presentation::{self, OptionField, Preset};
use kilosync_core::{Cache, CoreError, Engine, EngineConfig};

use crate::cli::{DescribeTarget, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DefinitionRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Options")]
    options: String,
}

#[derive(Debug, Serialize)]
struct VariableEntry {
    name: &'static str,
    label: &'static str,
    value: String,
}

#[derive(Tabled)]
struct VariableRow {
    #[tabled(rename = "Variable")]
    name: &'static str,
    #[tabled(rename = "Label")]
    label: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct PresetRow {
    #[tabled(rename = "Category")]
    category: &'static str,
    #[tabled(rename = "Label")]
    label: &'static str,
    #[tabled(rename = "Button")]
    text: &'static str,
    #[tabled(rename = "Action")]
    action: String,
}

fn summarize_options(options: &[OptionField]) -> String {
    options
        .iter()
        .map(|field| {
            let choices: Vec<&str> = field.choices.iter().map(|c| c.id.as_str()).collect();
            let default = field.default.as_deref().unwrap_or("-");
            format!("{}: {} [default {default}]", field.id, choices.join("|"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Targets answerable without a device.
pub fn handle_offline(target: DescribeTarget, global: &GlobalOpts) -> Result<(), CliError> {
    match target {
        DescribeTarget::Presets => print_presets(global),
        DescribeTarget::Variables { .. } => print_variables(&Cache::empty(), global),
        DescribeTarget::Actions | DescribeTarget::Feedbacks => {
            return Err(CliError::Validation {
                field: "describe".into(),
                reason: "actions and feedbacks need a connected device".into(),
            });
        }
    }
    Ok(())
}

pub async fn handle(
    engine: &Engine,
    config: &EngineConfig,
    target: DescribeTarget,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !target.needs_device() {
        return handle_offline(target, global);
    }

    util::connect(engine, config, global).await?;
    let snapshot = engine.capabilities().ok_or_else(|| {
        CliError::from(CoreError::OperationFailed {
            message: "device reported no capabilities".into(),
        })
    })?;

    let out = match target {
        DescribeTarget::Actions => {
            let actions = presentation::action_definitions(&snapshot);
            output::render_list(
                &global.output,
                &actions,
                |a| DefinitionRow {
                    id: a.id,
                    name: a.name,
                    options: summarize_options(&a.options),
                },
                |a| a.id.to_owned(),
            )
        }
        DescribeTarget::Feedbacks => {
            let feedbacks = presentation::feedback_definitions(&snapshot);
            output::render_list(
                &global.output,
                &feedbacks,
                |f| DefinitionRow {
                    id: f.id,
                    name: f.name,
                    options: summarize_options(&f.options),
                },
                |f| f.id.to_owned(),
            )
        }
        DescribeTarget::Variables { .. } => {
            print_variables(&engine.cache(), global);
            return Ok(());
        }
        DescribeTarget::Presets => {
            print_presets(global);
            return Ok(());
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_variables(cache: &Cache, global: &GlobalOpts) {
    let mut values: BTreeMap<&'static str, String> = presentation::variable_values(cache);
    let entries: Vec<VariableEntry> = presentation::variable_definitions()
        .into_iter()
        .map(|def| VariableEntry {
            name: def.name,
            label: def.label,
            value: values
                .remove(def.name)
                .unwrap_or_else(|| presentation::UNKNOWN_VALUE.to_owned()),
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &entries,
        |e| VariableRow {
            name: e.name,
            label: e.label,
            value: e.value.clone(),
        },
        |e| format!("{}={}", e.name, e.value),
    );
    output::print_output(&out, global.quiet);
}

fn print_presets(global: &GlobalOpts) {
    let presets: Vec<Preset> = presentation::presets();
    let out = output::render_list(
        &global.output,
        &presets,
        |p| PresetRow {
            category: p.category,
            label: p.label,
            text: p.text,
            action: format!("{} recording ({})", p.action.label(), p.stream),
        },
        |p| p.id.to_owned(),
    );
    output::print_output(&out, global.quiet);
}
