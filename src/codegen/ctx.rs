use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::mem;

use crate::analysis::ClassName;
use crate::util::slice_formatter;

use super::layout::SELF_REG;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local<'buf> {
    pub reg: String,
    pub ty: ClassName<'buf>,
}

/// The state of the function being generated. A fresh one is created for every function.
#[derive(Debug, Clone)]
pub struct FuncCtx<'buf> {
    next_id: usize,
    frames: Vec<HashMap<Cow<'buf, [u8]>, Local<'buf>>>,
    used_regs: HashSet<String>,
    pending_frees: Vec<String>,
    branch_depth: usize,
}

impl<'buf> FuncCtx<'buf> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            frames: vec![HashMap::new()],
            used_regs: HashSet::from([SELF_REG.to_owned()]),
            pending_frees: vec![],
            branch_depth: 0,
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        id
    }

    /// A fresh temporary register.
    pub fn temp(&mut self) -> String {
        format!("t.{}", self.next_id())
    }

    /// Fresh labels named `<prefix>.<name>.N` that share the same `N`.
    pub fn labels<const N: usize>(&mut self, prefix: &str, names: [&str; N]) -> [String; N] {
        let id = self.next_id();

        names.map(|name| format!("{}.{}.{}", prefix, name, id))
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Binds `name` in the innermost frame and returns the register allocated for it.
    ///
    /// The register is named after the identifier unless that name has already been given out in
    /// this function, in which case a numeric suffix is appended.
    pub fn bind(&mut self, name: Cow<'buf, [u8]>, ty: ClassName<'buf>) -> String {
        let base = slice_formatter(&name).to_string();

        let reg = if self.used_regs.contains(&base) {
            format!("{}.{}", base, self.next_id())
        } else {
            base
        };

        self.used_regs.insert(reg.clone());

        if self.frames.is_empty() {
            self.push_frame();
        }

        if let Some(frame) = self.frames.last_mut() {
            frame.insert(
                name,
                Local {
                    reg: reg.clone(),
                    ty,
                },
            );
        }

        reg
    }

    pub fn resolve(&self, name: &[u8]) -> Option<&Local<'buf>> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn enter_branch(&mut self) {
        self.branch_depth += 1;
    }

    pub fn leave_branch(&mut self) {
        self.branch_depth = self.branch_depth.saturating_sub(1);
    }

    /// Records an object that has to be freed before the function returns.
    ///
    /// Objects allocated inside an `if` arm or a loop are not recorded: their register is not
    /// defined on every path to the return, or holds only the last allocation.
    pub fn record_alloc(&mut self, reg: String) {
        if self.branch_depth == 0 {
            self.pending_frees.push(reg);
        }
    }

    pub fn take_pending_frees(&mut self) -> Vec<String> {
        mem::take(&mut self.pending_frees)
    }
}

impl Default for FuncCtx<'_> {
    fn default() -> Self {
        Self::new()
    }
}
