use std::borrow::Cow;
use std::fmt::{self, Display};
use std::iter;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::ast::TyName;
use crate::util::{slice_formatter, CloneStatic};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinClass {
    Object,
    IO,
    Int,
    String,
    Bool,
}

impl BuiltinClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::IO => "IO",
            Self::Int => "Int",
            Self::String => "String",
            Self::Bool => "Bool",
        }
    }
}

impl Display for BuiltinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassName<'buf> {
    Builtin(BuiltinClass),
    Named(Cow<'buf, [u8]>),
    SelfType,
}

impl<'buf> ClassName<'buf> {
    /// Replaces `SELF_TYPE` with `self_ty`.
    pub fn resolve(&self, self_ty: &ClassName<'buf>) -> ClassName<'buf> {
        match self {
            Self::SelfType => self_ty.clone(),
            _ => self.clone(),
        }
    }

    /// Returns `true` for the classes whose values are compared by value: `Int`, `Bool` and
    /// `String`.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Builtin(BuiltinClass::Int | BuiltinClass::Bool | BuiltinClass::String)
        )
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Builtin(builtin) => builtin.as_str().as_bytes(),
            Self::Named(name) => name,
            Self::SelfType => b"SELF_TYPE",
        }
    }
}

impl Display for ClassName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => write!(f, "{}", builtin),
            Self::Named(name) => write!(f, "{}", slice_formatter(name)),
            Self::SelfType => write!(f, "SELF_TYPE"),
        }
    }
}

impl Serialize for ClassName<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'buf> From<Cow<'buf, [u8]>> for ClassName<'buf> {
    fn from(name: Cow<'buf, [u8]>) -> Self {
        match &*name {
            b"Int" => BuiltinClass::Int.into(),
            b"String" => BuiltinClass::String.into(),
            b"Bool" => BuiltinClass::Bool.into(),
            b"Object" => BuiltinClass::Object.into(),
            b"IO" => BuiltinClass::IO.into(),
            b"SELF_TYPE" => Self::SelfType,
            _ => Self::Named(name),
        }
    }
}

impl<'buf> From<&'buf [u8]> for ClassName<'buf> {
    fn from(name: &'buf [u8]) -> Self {
        Cow::Borrowed(name).into()
    }
}

impl<'buf> From<BuiltinClass> for ClassName<'buf> {
    fn from(builtin: BuiltinClass) -> Self {
        Self::Builtin(builtin)
    }
}

impl<'buf> From<&TyName<'buf>> for ClassName<'buf> {
    fn from(ty_name: &TyName<'buf>) -> Self {
        ty_name.0 .0.value.clone().into()
    }
}

impl CloneStatic<ClassName<'static>> for ClassName<'_> {
    fn clone_static(&self) -> ClassName<'static> {
        match self {
            Self::Builtin(builtin) => ClassName::Builtin(*builtin),
            Self::Named(name) => ClassName::Named(name.clone_static()),
            Self::SelfType => ClassName::SelfType,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MethodTy<'buf> {
    pub params: Vec<ClassName<'buf>>,
    pub ret: ClassName<'buf>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldTy<'buf> {
    pub ty: ClassName<'buf>,
}

/// The signatures of a class's own members.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex<'buf> {
    parent: Option<ClassName<'buf>>,
    methods: IndexMap<Cow<'buf, [u8]>, MethodTy<'buf>>,
    fields: IndexMap<Cow<'buf, [u8]>, FieldTy<'buf>>,
}

impl<'buf> ClassIndex<'buf> {
    pub fn new(parent: Option<ClassName<'buf>>) -> Self {
        Self {
            parent,
            methods: IndexMap::new(),
            fields: IndexMap::new(),
        }
    }

    pub fn parent(&self) -> Option<&ClassName<'buf>> {
        self.parent.as_ref()
    }

    /// Returns `false` if a method with the same name has already been added.
    pub fn add_method(&mut self, name: Cow<'buf, [u8]>, ty: MethodTy<'buf>) -> bool {
        match self.methods.entry(name) {
            Entry::Occupied(_) => false,

            Entry::Vacant(entry) => {
                entry.insert(ty);

                true
            }
        }
    }

    /// Returns `false` if a field with the same name has already been added.
    pub fn add_field(&mut self, name: Cow<'buf, [u8]>, ty: FieldTy<'buf>) -> bool {
        match self.fields.entry(name) {
            Entry::Occupied(_) => false,

            Entry::Vacant(entry) => {
                entry.insert(ty);

                true
            }
        }
    }

    pub fn method(&self, name: &[u8]) -> Option<&MethodTy<'buf>> {
        self.methods.get(name)
    }

    pub fn field(&self, name: &[u8]) -> Option<&FieldTy<'buf>> {
        self.fields.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = (&[u8], &MethodTy<'buf>)> {
        self.methods.iter().map(|(name, ty)| (name.as_ref(), ty))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&[u8], &FieldTy<'buf>)> {
        self.fields.iter().map(|(name, ty)| (name.as_ref(), ty))
    }
}

struct Members<'a, 'buf, T>(&'a IndexMap<Cow<'buf, [u8]>, T>);

impl<T: Serialize> Serialize for Members<'_, '_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, ty)| (slice_formatter(name), ty)))
    }
}

impl Serialize for ClassIndex<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ClassIndex", 3)?;
        state.serialize_field("parent", &self.parent)?;
        state.serialize_field("methods", &Members(&self.methods))?;
        state.serialize_field("fields", &Members(&self.fields))?;

        state.end()
    }
}

/// The class table: every known class with its parent and member signatures.
#[derive(Debug, Clone, Default)]
pub struct TypeCtx<'buf> {
    classes: IndexMap<ClassName<'buf>, ClassIndex<'buf>>,
}

impl<'buf> TypeCtx<'buf> {
    pub fn new() -> Self {
        Self {
            classes: IndexMap::new(),
        }
    }

    /// Returns `false` if the class has already been added.
    pub fn add_class(&mut self, name: ClassName<'buf>, index: ClassIndex<'buf>) -> bool {
        match self.classes.entry(name) {
            Entry::Occupied(_) => false,

            Entry::Vacant(entry) => {
                entry.insert(index);

                true
            }
        }
    }

    pub fn get_class(&self, name: &ClassName<'buf>) -> Option<&ClassIndex<'buf>> {
        self.classes.get(name)
    }

    pub fn get_class_mut(&mut self, name: &ClassName<'buf>) -> Option<&mut ClassIndex<'buf>> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &ClassName<'buf>) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassName<'buf>, &ClassIndex<'buf>)> {
        self.classes.iter()
    }

    /// Iterates over `name` and its ancestors, closest first.
    ///
    /// The walk is bounded by the number of classes, so it terminates even if the parent links
    /// form a cycle.
    pub fn inheritance_chain<'a>(
        &'a self,
        name: &'a ClassName<'buf>,
    ) -> impl Iterator<Item = &'a ClassName<'buf>> + 'a {
        iter::successors(Some(name), move |name| self.get_class(name)?.parent())
            .take(self.classes.len().max(1))
    }

    /// Finds the closest class in the chain of `class` that defines `method`.
    pub fn lookup_method<'a>(
        &'a self,
        class: &'a ClassName<'buf>,
        method: &[u8],
    ) -> Option<(&'a ClassName<'buf>, &'a MethodTy<'buf>)> {
        self.inheritance_chain(class)
            .find_map(|name| Some((name, self.get_class(name)?.method(method)?)))
    }

    /// Finds the closest class in the chain of `class` that defines `field`.
    pub fn lookup_field<'a>(
        &'a self,
        class: &'a ClassName<'buf>,
        field: &[u8],
    ) -> Option<(&'a ClassName<'buf>, &'a FieldTy<'buf>)> {
        self.inheritance_chain(class)
            .find_map(|name| Some((name, self.get_class(name)?.field(field)?)))
    }

    /// Lists the fields of `class`, including the inherited ones: ancestors first, each class's
    /// fields in declaration order.
    pub fn fields_in_layout_order<'a>(
        &'a self,
        class: &'a ClassName<'buf>,
    ) -> Vec<(&'a [u8], &'a FieldTy<'buf>)> {
        let chain = self.inheritance_chain(class).collect::<Vec<_>>();

        chain
            .into_iter()
            .rev()
            .filter_map(|name| self.get_class(name))
            .flat_map(ClassIndex::fields)
            .collect()
    }

    /// The number of ancestors of `class`.
    pub fn depth(&self, class: &ClassName<'buf>) -> usize {
        self.inheritance_chain(class).count().saturating_sub(1)
    }

    /// Checks whether `sub` is `sup` or one of its descendants.
    pub fn conforms(
        &self,
        sub: &ClassName<'buf>,
        sup: &ClassName<'buf>,
        self_ty: &ClassName<'buf>,
    ) -> bool {
        let sub = sub.resolve(self_ty);
        let sup = sup.resolve(self_ty);

        let conforms = self.inheritance_chain(&sub).any(|name| name == &sup);

        conforms
    }

    /// Computes the least upper bound of two types.
    ///
    /// Built-in classes only join with themselves; any other mix involving them joins to `Object`.
    pub fn join(
        &self,
        lhs: &ClassName<'buf>,
        rhs: &ClassName<'buf>,
        self_ty: &ClassName<'buf>,
    ) -> ClassName<'buf> {
        let lhs = lhs.resolve(self_ty);
        let rhs = rhs.resolve(self_ty);

        if lhs == rhs {
            return lhs;
        }

        if lhs.is_builtin() || rhs.is_builtin() {
            return BuiltinClass::Object.into();
        }

        let rhs_chain = self.inheritance_chain(&rhs).collect::<Vec<_>>();

        let joined = self
            .inheritance_chain(&lhs)
            .find(|name| rhs_chain.contains(name))
            .cloned()
            .unwrap_or(ClassName::Builtin(BuiltinClass::Object));

        joined
    }
}

impl Serialize for TypeCtx<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.classes.iter())
    }
}
