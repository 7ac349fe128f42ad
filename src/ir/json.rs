//! Serialization into the canonical Bril JSON representation.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::func::{Function, Param, Program};
use super::instr::Instr;
use super::ty::{IrTy, Literal};

impl Serialize for IrTy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int => serializer.serialize_str("int"),
            Self::Bool => serializer.serialize_str("bool"),

            Self::Ptr(pointee) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ptr", pointee)?;

                map.end()
            }
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::Int(value) => serializer.serialize_i64(value),
            Self::Bool(value) => serializer.serialize_bool(value),
        }
    }
}

fn serialize_nonempty<M: SerializeMap>(
    map: &mut M,
    key: &'static str,
    values: &[String],
) -> Result<(), M::Error> {
    if values.is_empty() {
        Ok(())
    } else {
        map.serialize_entry(key, values)
    }
}

impl Serialize for Instr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        match self {
            Self::Label(name) => map.serialize_entry("label", name)?,

            Self::Const { dest, ty, value } => {
                map.serialize_entry("op", "const")?;
                map.serialize_entry("dest", dest)?;
                map.serialize_entry("type", ty)?;
                map.serialize_entry("value", value)?;
            }

            Self::Value {
                op,
                dest,
                ty,
                args,
                funcs,
            } => {
                map.serialize_entry("op", op.as_str())?;
                map.serialize_entry("dest", dest)?;
                map.serialize_entry("type", ty)?;
                serialize_nonempty(&mut map, "args", args)?;
                serialize_nonempty(&mut map, "funcs", funcs)?;
            }

            Self::Effect {
                op,
                args,
                funcs,
                labels,
            } => {
                map.serialize_entry("op", op.as_str())?;
                serialize_nonempty(&mut map, "args", args)?;
                serialize_nonempty(&mut map, "funcs", funcs)?;
                serialize_nonempty(&mut map, "labels", labels)?;
            }
        }

        map.end()
    }
}

impl Serialize for Param {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.ty)?;

        map.end()
    }
}

impl Serialize for Function {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("args", &self.args)?;

        if let Some(ty) = &self.ret_ty {
            map.serialize_entry("type", ty)?;
        }

        map.serialize_entry("instrs", &self.instrs)?;

        map.end()
    }
}

impl Serialize for Program {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("functions", &self.functions)?;

        map.end()
    }
}
