
use enum_display::EnumDisplay;

use crate::tree::StageAnnotation;
use crate::types::{ScalarKind, Type, type_assignable};

/// Names every stage can see without binding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumDisplay)]
pub enum Builtin {
    #[display("vec3")]
    Vec3,
    #[display("vec4")]
    Vec4,
    #[display("normalize")]
    Normalize,
    #[display("dot")]
    Dot,
    #[display("gl_Position")]
    GlPosition,
    #[display("gl_FragColor")]
    GlFragColor,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin::Vec3,
    Builtin::Vec4,
    Builtin::Normalize,
    Builtin::Dot,
    Builtin::GlPosition,
    Builtin::GlFragColor,
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTINS.iter().copied().find(|b| b.to_string() == name)
    }

    pub fn is_function(&self) -> bool {
        !matches!(self, Builtin::GlPosition | Builtin::GlFragColor)
    }

    pub fn available_in(&self, annotation: StageAnnotation) -> bool {
        match self {
            Builtin::GlPosition => annotation == StageAnnotation::Vertex,
            Builtin::GlFragColor => annotation == StageAnnotation::Fragment,
            _ => true,
        }
    }

    /// Type of a builtin variable.
    pub fn var_type(&self) -> Option<Type> {
        match self {
            Builtin::GlPosition | Builtin::GlFragColor => Some(Type::vec(ScalarKind::Float, 4)),
            _ => None,
        }
    }

    /// Overloads of a builtin function, tried in order.
    pub fn signatures(&self) -> Vec<Type> {
        let float3 = Type::vec(ScalarKind::Float, 3);
        let float4 = Type::vec(ScalarKind::Float, 4);
        match self {
            Builtin::Vec3 => vec![Type::func(
                vec![Type::FLOAT, Type::FLOAT, Type::FLOAT],
                float3,
            )],
            Builtin::Vec4 => vec![
                Type::func(
                    vec![Type::FLOAT, Type::FLOAT, Type::FLOAT, Type::FLOAT],
                    float4.clone(),
                ),
                Type::func(vec![float3, Type::FLOAT], float4),
            ],
            Builtin::Normalize => vec![
                Type::func(vec![float3.clone()], float3),
                Type::func(vec![float4.clone()], float4),
            ],
            Builtin::Dot => vec![
                Type::func(vec![float3.clone(), float3], Type::FLOAT),
                Type::func(vec![float4.clone(), float4], Type::FLOAT),
            ],
            Builtin::GlPosition | Builtin::GlFragColor => Vec::new(),
        }
    }

    /// Pick the first overload whose parameters accept `args`.
    pub fn resolve_overload(&self, args: &[Type]) -> Option<Type> {
        self.signatures().into_iter().find(|sig| {
            let Type::Fn { params, .. } = sig else {
                return false;
            };
            params.len() == args.len()
                && params
                    .iter()
                    .zip(args)
                    .all(|(param, arg)| type_assignable(arg, param).is_ok())
        })
    }
}

