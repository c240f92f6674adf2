use super::{EmitOptions, sibling};
use crate::naming::TableNames;

pub(super) fn render(names: &TableNames, options: &EmitOptions) -> String {
    format!(
        "// Starter class for {table}, created once by dbclassgen and never overwritten.
// Add custom behavior here; the generated base is reachable through `Deref`.

use std::ops::{{Deref, DerefMut}};

use {generated_path}::{generated};

#[derive(Debug, Clone, Default)]
pub struct {starter}(pub(crate) {generated});

impl {starter} {{
    pub fn new() -> Self {{
        Self::default()
    }}
}}

impl Deref for {starter} {{
    type Target = {generated};

    fn deref(&self) -> &Self::Target {{
        &self.0
    }}
}}

impl DerefMut for {starter} {{
    fn deref_mut(&mut self) -> &mut Self::Target {{
        &mut self.0
    }}
}}

impl From<{generated}> for {starter} {{
    fn from(generated: {generated}) -> Self {{
        Self(generated)
    }}
}}
",
        table = names.table,
        generated_path = sibling(&options.generated_dir, &names.class.module),
        generated = names.class.generated,
        starter = names.class.starter,
    )
}
