use std::error::Error;

use serde::Serialize;

use super::NewModelCmd;
use crate::commands::{Context, Execute};

#[derive(Debug, Clone, Serialize)]
pub struct NewModelResult {
    pub id: String,
    pub name: String,
    pub owner: String,
}

impl Execute for NewModelCmd {
    type Output = NewModelResult;

    fn execute(self, ctx: &Context) -> Result<Self::Output, Box<dyn Error>> {
        let owner = ctx.require_principal()?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Data model name must not be empty".into());
        }

        let store = ctx.connect()?;
        store.setup()?;
        let model = store.create_data_model(owner, name)?;

        Ok(NewModelResult {
            id: model.id,
            name: model.name,
            owner: model.owner,
        })
    }
}
