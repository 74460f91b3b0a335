//! Reflection over validated naga modules.
//!
//! Two questions are answered here: which sandbox uniforms a linked program
//! actually reads (and where they live inside the uniform block), and whether
//! the vertex stage produces every input the fragment stage consumes.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use wgpu::naga;

use crate::compile::{UNIFORM_BINDING, UNIFORM_GROUP};

/// The four uniforms every frame pushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UniformName {
    Projection,
    Resolution,
    Mouse,
    Time,
}

impl UniformName {
    pub const ALL: [UniformName; 4] = [
        UniformName::Projection,
        UniformName::Resolution,
        UniformName::Mouse,
        UniformName::Time,
    ];

    /// Identifier used inside GLSL sources.
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformName::Projection => "projection",
            UniformName::Resolution => "uResolution",
            UniformName::Mouse => "uMouse",
            UniformName::Time => "uTime",
        }
    }

    pub fn from_glsl(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|uniform| uniform.glsl_name() == name)
    }

    /// Size in bytes of the value pushed for this uniform.
    pub fn size(self) -> u32 {
        match self {
            UniformName::Projection => 64,
            UniformName::Resolution | UniformName::Mouse => 8,
            UniformName::Time => 4,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformName::Projection => f.write_str("projection"),
            UniformName::Resolution => f.write_str("resolution"),
            UniformName::Mouse => f.write_str("mouse"),
            UniformName::Time => f.write_str("time"),
        }
    }
}

/// Location of a resolved uniform inside the std140 block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformBinding {
    pub offset: u32,
    pub size: u32,
}

/// Uniform bindings of one linked program. A missing entry means no stage
/// reads the uniform, so pushes for it are skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniformBindings {
    slots: [Option<UniformBinding>; 4],
}

impl UniformBindings {
    pub fn get(&self, name: UniformName) -> Option<UniformBinding> {
        self.slots[name.index()]
    }

    pub fn insert(&mut self, name: UniformName, binding: UniformBinding) {
        self.slots[name.index()] = Some(binding);
    }

    pub fn resolved(&self) -> impl Iterator<Item = (UniformName, UniformBinding)> + '_ {
        UniformName::ALL
            .into_iter()
            .filter_map(|name| self.get(name).map(|binding| (name, binding)))
    }

    pub fn unresolved(&self) -> Vec<UniformName> {
        UniformName::ALL
            .into_iter()
            .filter(|name| self.get(*name).is_none())
            .collect()
    }
}

/// Resolves the sandbox uniforms referenced by any of the given stages.
pub fn resolve_bindings(stages: &[&naga::Module]) -> UniformBindings {
    let mut bindings = UniformBindings::default();
    for module in stages {
        let Some((block, members)) = uniform_block(module) else {
            continue;
        };
        for index in accessed_members(module, block) {
            let Some(member) = members.get(index as usize) else {
                continue;
            };
            let Some(name) = member.name.as_deref().and_then(UniformName::from_glsl) else {
                continue;
            };
            bindings.insert(
                name,
                UniformBinding {
                    offset: member.offset,
                    size: name.size(),
                },
            );
        }
    }
    bindings
}

fn uniform_block(
    module: &naga::Module,
) -> Option<(naga::Handle<naga::GlobalVariable>, &[naga::StructMember])> {
    module.global_variables.iter().find_map(|(handle, var)| {
        if var.space != naga::AddressSpace::Uniform {
            return None;
        }
        let binding = var.binding.as_ref()?;
        if binding.group != UNIFORM_GROUP || binding.binding != UNIFORM_BINDING {
            return None;
        }
        match &module.types[var.ty].inner {
            naga::TypeInner::Struct { members, .. } => Some((handle, members.as_slice())),
            _ => None,
        }
    })
}

/// Members of `block` read by expressions that some statement actually uses.
///
/// The GLSL frontend materialises an `AccessIndex` for every member of an
/// anonymous block in every function, so the expression arena alone says
/// nothing about use. Only expressions reachable from the body count.
fn accessed_members(
    module: &naga::Module,
    block: naga::Handle<naga::GlobalVariable>,
) -> BTreeSet<u32> {
    let functions = module
        .functions
        .iter()
        .map(|(_, function)| function)
        .chain(module.entry_points.iter().map(|entry| &entry.function));

    let mut accessed = BTreeSet::new();
    for function in functions {
        let mut pending = Vec::new();
        statement_operands(&function.body, &mut pending);
        pending.extend(
            function
                .local_variables
                .iter()
                .filter_map(|(_, local)| local.init),
        );

        let mut visited = HashSet::new();
        while let Some(handle) = pending.pop() {
            if !visited.insert(handle) {
                continue;
            }
            let expression = &function.expressions[handle];
            if let naga::Expression::AccessIndex { base, index } = *expression {
                if matches!(
                    function.expressions[base],
                    naga::Expression::GlobalVariable(global) if global == block
                ) {
                    accessed.insert(index);
                }
            }
            expression_operands(expression, &mut pending);
        }
    }
    accessed
}

type ExpressionHandle = naga::Handle<naga::Expression>;

/// Expressions a block's statements consume. `Emit` only evaluates and is
/// not a use.
fn statement_operands(block: &naga::Block, out: &mut Vec<ExpressionHandle>) {
    for statement in block {
        match statement {
            naga::Statement::Block(inner) => statement_operands(inner, out),
            naga::Statement::If {
                condition,
                accept,
                reject,
            } => {
                out.push(*condition);
                statement_operands(accept, out);
                statement_operands(reject, out);
            }
            naga::Statement::Switch { selector, cases } => {
                out.push(*selector);
                for case in cases {
                    statement_operands(&case.body, out);
                }
            }
            naga::Statement::Loop {
                body,
                continuing,
                break_if,
            } => {
                statement_operands(body, out);
                statement_operands(continuing, out);
                out.extend(*break_if);
            }
            naga::Statement::Return { value } => out.extend(*value),
            naga::Statement::Store { pointer, value } => out.extend([*pointer, *value]),
            naga::Statement::ImageStore {
                image,
                coordinate,
                array_index,
                value,
            } => {
                out.extend([*image, *coordinate, *value]);
                out.extend(*array_index);
            }
            naga::Statement::Atomic { pointer, value, .. } => out.extend([*pointer, *value]),
            naga::Statement::ImageAtomic {
                image,
                coordinate,
                array_index,
                value,
                ..
            } => {
                out.extend([*image, *coordinate, *value]);
                out.extend(*array_index);
            }
            naga::Statement::WorkGroupUniformLoad { pointer, .. } => out.push(*pointer),
            naga::Statement::Call { arguments, .. } => out.extend(arguments.iter().copied()),
            naga::Statement::SubgroupBallot { predicate, .. } => out.extend(*predicate),
            naga::Statement::SubgroupGather { argument, .. }
            | naga::Statement::SubgroupCollectiveOperation { argument, .. } => {
                out.push(*argument)
            }
            _ => {}
        }
    }
}

fn expression_operands(expression: &naga::Expression, out: &mut Vec<ExpressionHandle>) {
    use naga::Expression as E;
    match expression {
        E::Compose { components, .. } => out.extend(components.iter().copied()),
        E::Access { base, index } => out.extend([*base, *index]),
        E::AccessIndex { base, .. } => out.push(*base),
        E::Splat { value, .. } => out.push(*value),
        E::Swizzle { vector, .. } => out.push(*vector),
        E::Load { pointer } => out.push(*pointer),
        E::ImageSample {
            image,
            sampler,
            coordinate,
            array_index,
            offset,
            level,
            depth_ref,
            ..
        } => {
            out.extend([*image, *sampler, *coordinate]);
            out.extend(*array_index);
            out.extend(*offset);
            out.extend(*depth_ref);
            match *level {
                naga::SampleLevel::Exact(value) | naga::SampleLevel::Bias(value) => {
                    out.push(value)
                }
                naga::SampleLevel::Gradient { x, y } => out.extend([x, y]),
                naga::SampleLevel::Auto | naga::SampleLevel::Zero => {}
            }
        }
        E::ImageLoad {
            image,
            coordinate,
            array_index,
            sample,
            level,
        } => {
            out.extend([*image, *coordinate]);
            out.extend(*array_index);
            out.extend(*sample);
            out.extend(*level);
        }
        E::ImageQuery { image, query } => {
            out.push(*image);
            if let naga::ImageQuery::Size { level: Some(level) } = query {
                out.push(*level);
            }
        }
        E::Unary { expr, .. } | E::Derivative { expr, .. } | E::As { expr, .. } => {
            out.push(*expr)
        }
        E::Binary { left, right, .. } => out.extend([*left, *right]),
        E::Select {
            condition,
            accept,
            reject,
        } => out.extend([*condition, *accept, *reject]),
        E::Relational { argument, .. } => out.push(*argument),
        E::Math {
            arg,
            arg1,
            arg2,
            arg3,
            ..
        } => {
            out.push(*arg);
            out.extend([*arg1, *arg2, *arg3].into_iter().flatten());
        }
        E::ArrayLength(array) => out.push(*array),
        E::RayQueryVertexPositions { query, .. } | E::RayQueryGetIntersection { query, .. } => {
            out.push(*query)
        }
        _ => {}
    }
}

/// Checks that every located fragment input is written by the vertex stage
/// with the same type. Built-ins are ignored.
pub fn check_interface(vertex: &naga::Module, fragment: &naga::Module) -> Result<(), String> {
    let outputs = stage_outputs(vertex, naga::ShaderStage::Vertex)
        .ok_or_else(|| "vertex stage has no entry point".to_string())?;
    let inputs = stage_inputs(fragment, naga::ShaderStage::Fragment)
        .ok_or_else(|| "fragment stage has no entry point".to_string())?;

    let mut problems = Vec::new();
    for (location, input) in &inputs {
        match outputs.get(location) {
            None => problems.push(format!(
                "fragment input `{}` at location {location} is not written by the vertex stage",
                input.name
            )),
            Some(output) if output.ty != input.ty => problems.push(format!(
                "fragment input `{}` at location {location} is {} but the vertex stage writes {} (`{}`)",
                input.name,
                describe(&input.ty),
                describe(&output.ty),
                output.name
            )),
            Some(_) => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}

struct Varying {
    name: String,
    ty: naga::TypeInner,
}

fn stage_inputs(module: &naga::Module, stage: naga::ShaderStage) -> Option<BTreeMap<u32, Varying>> {
    let entry = module.entry_points.iter().find(|entry| entry.stage == stage)?;
    let mut varyings = BTreeMap::new();
    for argument in &entry.function.arguments {
        collect_varyings(
            module,
            argument.ty,
            argument.binding.as_ref(),
            argument.name.as_deref(),
            &mut varyings,
        );
    }
    Some(varyings)
}

fn stage_outputs(
    module: &naga::Module,
    stage: naga::ShaderStage,
) -> Option<BTreeMap<u32, Varying>> {
    let entry = module.entry_points.iter().find(|entry| entry.stage == stage)?;
    let mut varyings = BTreeMap::new();
    if let Some(result) = &entry.function.result {
        collect_varyings(module, result.ty, result.binding.as_ref(), None, &mut varyings);
    }
    Some(varyings)
}

fn collect_varyings(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    name: Option<&str>,
    varyings: &mut BTreeMap<u32, Varying>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            varyings.insert(
                *location,
                Varying {
                    name: name.unwrap_or("<unnamed>").to_string(),
                    ty: module.types[ty].inner.clone(),
                },
            );
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_varyings(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_deref(),
                        varyings,
                    );
                }
            }
        }
    }
}

fn describe(ty: &naga::TypeInner) -> String {
    match ty {
        naga::TypeInner::Scalar(scalar) => scalar_name(scalar).to_string(),
        naga::TypeInner::Vector { size, scalar } => {
            let prefix = match scalar.kind {
                naga::ScalarKind::Sint => "i",
                naga::ScalarKind::Uint => "u",
                naga::ScalarKind::Bool => "b",
                _ => "",
            };
            format!("{prefix}vec{}", *size as u8)
        }
        other => format!("{other:?}"),
    }
}

fn scalar_name(scalar: &naga::Scalar) -> &'static str {
    match scalar.kind {
        naga::ScalarKind::Sint => "int",
        naga::ScalarKind::Uint => "uint",
        naga::ScalarKind::Bool => "bool",
        _ => "float",
    }
}
