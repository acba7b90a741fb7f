//! Generated-artifact processors.
//!
//! Each processor owns one output kind. The [`Processor`] trait is the
//! visitor surface the pipeline drives: every hook defaults to a no-op and a
//! concrete processor overrides only the ones its pattern needs. Hooks run
//! synchronously, in registration order, and never mutate the declaration
//! model.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::model::{Class, Function, Module, Package, Type};
use crate::render::Template;

/// Marker supertype identifying a stateful container class. External
/// contract: an exact fully-qualified-name comparison, not type inspection.
pub const CONTAINER_HOST_CLASS: &str = "org/orbitmvi/orbit/ContainerHost";

/// Type names meaning "this generic slot is intentionally unused".
pub const ABSENT_TYPE_CLASSES: [&str; 2] = ["kotlin/Nothing", "kotlin/Unit"];

/// Lifecycle teardown hook, never exposed in generated bindings.
pub const TEARDOWN_FUNCTION: &str = "onCleared";

/// Extension of every generated source file.
pub const OUTPUT_EXTENSION: &str = "swift";

const STATE_OBJECT_TEMPLATE: &str = include_str!("../templates/state_object.swift.mustache");
const PUBLISHER_TEMPLATE: &str = include_str!("../templates/publisher.swift.mustache");

/// Shared, read-only context for one pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessorContext {
    /// Base name of the Apple framework the generated sources import.
    pub framework_name: String,
    pub output_dir: PathBuf,
}

/// Visitor over one run's inputs.
///
/// `on_framework` fires exactly once per run, independent of any decoded
/// library; the remaining hooks fire per decoded declaration.
pub trait Processor {
    fn on_framework(&self, _ctx: &ProcessorContext) -> Result<()> {
        Ok(())
    }

    fn on_library(&self, _ctx: &ProcessorContext, _module: &Module) -> Result<()> {
        Ok(())
    }

    fn on_package(&self, _ctx: &ProcessorContext, _package: &Package) -> Result<()> {
        Ok(())
    }

    fn on_package_function(&self, _ctx: &ProcessorContext, _function: &Function) -> Result<()> {
        Ok(())
    }

    fn on_class(&self, _ctx: &ProcessorContext, _class: &Class) -> Result<()> {
        Ok(())
    }
}

fn is_absent_type(fq_name: &str) -> bool {
    ABSENT_TYPE_CLASSES.contains(&fq_name)
}

/// Emits `<ClassSimpleName>StateObject.swift` for every class implementing
/// the container host marker supertype.
pub struct StateObjectProcessor {
    template: Template,
}

impl StateObjectProcessor {
    pub fn new() -> Result<Self> {
        let template = Template::compile(STATE_OBJECT_TEMPLATE)
            .context("compile bundled state object template")?;
        Ok(StateObjectProcessor { template })
    }
}

impl Processor for StateObjectProcessor {
    fn on_class(&self, ctx: &ProcessorContext, class: &Class) -> Result<()> {
        // Most classes are not containers; silence is the normal outcome.
        let Some(marker) = class
            .supertypes
            .iter()
            .find(|t| t.class_name() == Some(CONTAINER_HOST_CLASS))
        else {
            return Ok(());
        };

        let class_name = class.simple_name();

        if marker.arguments.len() < 2 {
            warn!(
                class = %class.name,
                "container host supertype has fewer than two type arguments; skipping class"
            );
            return Ok(());
        }
        let mut slots = Vec::with_capacity(2);
        for argument in &marker.arguments[..2] {
            match argument.ty.as_ref().and_then(Type::class_name) {
                Some(name) => slots.push(name),
                None => {
                    warn!(
                        class = %class.name,
                        "container host type argument does not resolve to a class; skipping class"
                    );
                    return Ok(());
                }
            }
        }
        let (state_class, side_effect_class) = (slots[0], slots[1]);

        let functions: Vec<Value> = class
            .functions
            .iter()
            .filter(|f| f.flags.is_public())
            .filter(|f| f.name != TEARDOWN_FUNCTION)
            .filter_map(|f| function_context(&class.name, f))
            .collect();

        let context = json!({
            "frameworkName": ctx.framework_name,
            "className": class_name,
            "hasState": !is_absent_type(state_class),
            "hasSideEffect": !is_absent_type(side_effect_class),
            // Sentinels keep their own simple name, never a substitute.
            "stateType": crate::model::simple_name(state_class),
            "sideEffectType": crate::model::simple_name(side_effect_class),
            "functions": functions,
        });

        let path = ctx
            .output_dir
            .join(format!("{}StateObject.{}", class_name, OUTPUT_EXTENSION));
        fs::write(&path, self.template.render(&context))
            .with_context(|| format!("write {}", path.display()))?;
        debug!(class = %class.name, output = %path.display(), "generated state object");
        Ok(())
    }
}

/// Builds the template entry for one function, or `None` when any parameter
/// type cannot be reduced to a simple class name. Only that function is
/// dropped; the rest of the class still generates.
fn function_context(class_name: &str, function: &Function) -> Option<Value> {
    let mut parameters = Vec::with_capacity(function.value_parameters.len());
    for parameter in &function.value_parameters {
        match parameter.ty.as_ref().and_then(Type::simple_class_name) {
            Some(simple) => parameters.push(json!({
                "name": parameter.name,
                "type": simple,
            })),
            None => {
                warn!(
                    class = %class_name,
                    function = %function.name,
                    parameter = %parameter.name,
                    "parameter type does not resolve to a class; excluding function from binding"
                );
                return None;
            }
        }
    }
    Some(json!({
        "name": function.name,
        "parameters": parameters,
    }))
}

/// Emits the one fixed `Publisher.swift` bridging utility. Independent of any
/// decoded library: it depends only on the framework name.
pub struct PublisherProcessor {
    template: Template,
}

impl PublisherProcessor {
    pub fn new() -> Result<Self> {
        let template =
            Template::compile(PUBLISHER_TEMPLATE).context("compile bundled publisher template")?;
        Ok(PublisherProcessor { template })
    }
}

impl Processor for PublisherProcessor {
    fn on_framework(&self, ctx: &ProcessorContext) -> Result<()> {
        let context = json!({ "frameworkName": ctx.framework_name });
        let path = ctx
            .output_dir
            .join(format!("Publisher.{}", OUTPUT_EXTENSION));
        fs::write(&path, self.template.render(&context))
            .with_context(|| format!("write {}", path.display()))?;
        debug!(output = %path.display(), "generated publisher");
        Ok(())
    }
}
