use std::path::{Path, PathBuf};

use primgroup_core::{
    builtin_definitions, builtin_kind_from_name, compute_mesh_node, input_count, Mesh, NodeParams,
};
use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

use crate::logging::parse_level_filter;

/// One cook: an operator name, its parameter overrides, input mesh files
/// and an optional output file. Relative paths resolve against the plan's
/// directory.
#[derive(Debug, Deserialize)]
pub(crate) struct CookPlan {
    pub node: String,
    #[serde(default)]
    pub params: NodeParams,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct HeadlessArgs {
    pub plan_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub print: bool,
    pub list: bool,
    pub help: bool,
    pub log_level: LevelFilter,
}

pub(crate) fn parse_headless_args(args: &[String]) -> Result<HeadlessArgs, String> {
    let mut parsed = HeadlessArgs {
        plan_path: None,
        output_path: None,
        print: false,
        list: false,
        help: false,
        log_level: LevelFilter::INFO,
    };
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--plan" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--plan requires a path".to_string())?;
                parsed.plan_path = Some(PathBuf::from(value));
            }
            "--output" | "-o" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--output requires a path".to_string())?;
                parsed.output_path = Some(PathBuf::from(value));
            }
            "--log-level" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--log-level requires a level".to_string())?;
                parsed.log_level = parse_level_filter(value)?;
            }
            "--print" => parsed.print = true,
            "--list" => parsed.list = true,
            "--help" | "-h" => parsed.help = true,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    Ok(parsed)
}

pub(crate) fn print_headless_help() {
    println!(
        "Usage: primgroup --plan <path> [options]\n  --plan <path>        cook plan (JSON)\n  --output <path>      write the cooked mesh here (overrides the plan)\n  --print              print the cooked mesh as JSON\n  --list               list available operators\n  --log-level <level>  off, error, warn, info, debug, trace\n  --help"
    );
}

pub(crate) fn print_node_list() {
    for definition in builtin_definitions() {
        let inputs: Vec<String> = definition
            .inputs
            .iter()
            .map(|pin| {
                if pin.optional {
                    format!("[{}]", pin.name)
                } else {
                    pin.name.clone()
                }
            })
            .collect();
        println!(
            "{} ({}): {}",
            definition.name,
            definition.category,
            inputs.join(", ")
        );
    }
}

pub(crate) fn run_headless(args: &HeadlessArgs) -> Result<(), String> {
    let plan_path = args
        .plan_path
        .as_ref()
        .ok_or_else(|| "--plan is required".to_string())?;
    let plan = load_cook_plan(plan_path)?;
    let base = plan_path.parent().unwrap_or_else(|| Path::new("."));

    let output = cook_plan(&plan, base)?;
    tracing::info!(
        "headless: '{}' produced {} points, {} primitives",
        plan.node,
        output.point_count(),
        output.primitive_count()
    );

    let output_path = args
        .output_path
        .clone()
        .or_else(|| plan.output.as_ref().map(|path| base.join(path)));
    if let Some(path) = output_path {
        save_mesh_json(&output, &path)?;
        tracing::info!("headless: saved mesh to {:?}", path);
    }

    if args.print {
        let json = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
        println!("{json}");
    }
    Ok(())
}

pub(crate) fn cook_plan(plan: &CookPlan, base: &Path) -> Result<Mesh, String> {
    let kind = builtin_kind_from_name(&plan.node)
        .ok_or_else(|| format!("unknown node '{}'", plan.node))?;
    let (required, maximum) = input_count(kind);
    if plan.inputs.len() < required || plan.inputs.len() > maximum {
        return Err(format!(
            "'{}' takes {}..={} inputs, plan lists {}",
            plan.node,
            required,
            maximum,
            plan.inputs.len()
        ));
    }

    let inputs = plan
        .inputs
        .iter()
        .map(|path| load_mesh_json(&base.join(path)))
        .collect::<Result<Vec<_>, _>>()?;
    compute_mesh_node(kind, &plan.params, &inputs).map_err(|err| err.to_string())
}

fn load_cook_plan(path: &Path) -> Result<CookPlan, String> {
    let data = std::fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("{}: {err}", path.display()))
}

fn load_mesh_json(path: &Path) -> Result<Mesh, String> {
    let data = std::fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("{}: {err}", path.display()))
}

fn save_mesh_json(mesh: &Mesh, path: &Path) -> Result<(), String> {
    let data = serde_json::to_vec_pretty(mesh).map_err(|err| err.to_string())?;
    std::fs::write(path, data).map_err(|err| format!("{}: {err}", path.display()))
}
