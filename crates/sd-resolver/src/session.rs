use crate::build::DefinitionBuilder;
use crate::referencer::{unique_base_action, unique_default_auth, unique_default_remote};
use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Creating,
    Resolving,
    Completed,
}

/// One resolution run over a full batch of raw definitions.
pub struct SchemaResolver {
    stage: Cell<Stage>,
    definitions: Vec<Definition>,
    index: BTreeMap<String, DefId>,
    queue: WorkQueue,
}

impl SchemaResolver {
    /// Builds one definition per raw definition, in input order, without
    /// resolving any cross-reference.
    pub fn create(raw: &[RawDefinition]) -> Result<Self, SchemaError> {
        let queue = WorkQueue::default();
        let (definitions, index) = {
            let mut builder = DefinitionBuilder::new(&queue);
            for definition in raw {
                builder.add(definition)?;
            }
            (builder.definitions, builder.index)
        };

        debug!(
            definitions = definitions.len(),
            pending = queue.len(),
            "created definitions"
        );

        Ok(Self {
            stage: Cell::new(Stage::Creating),
            definitions,
            index,
            queue,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    pub fn referencer(&self) -> Referencer<'_> {
        Referencer {
            stage: &self.stage,
            definitions: &self.definitions,
            index: &self.index,
            queue: &self.queue,
        }
    }

    /// Drains the work queue until no cell is pending, then checks the
    /// graph-wide invariants.
    pub fn resolve(&self) -> Result<(), SchemaError> {
        if self.stage.get() != Stage::Creating {
            return Err(SchemaError::new(
                "STAGE_VIOLATION",
                format!("Resolution started while the resolver is {:?}.", self.stage.get()),
            ));
        }
        self.stage.set(Stage::Resolving);

        let referencer = self.referencer();
        let mut rounds = 0;
        loop {
            let pending = self.queue.take();
            if pending.is_empty() {
                break;
            }
            rounds += 1;
            debug!(round = rounds, cells = pending.len(), "forcing deferred cells");
            for cell in pending {
                cell.force_erased(&referencer)?;
            }
        }

        unique_base_action(&self.definitions)?;
        unique_default_auth(&self.definitions)?;
        unique_default_remote(&self.definitions)?;

        self.stage.set(Stage::Completed);
        debug!(rounds, "resolution completed");
        Ok(())
    }

    /// Hands out the immutable graph once resolution has completed.
    pub fn finish(self) -> Result<Schema, SchemaError> {
        if self.stage.get() != Stage::Completed {
            return Err(SchemaError::new(
                "STAGE_VIOLATION",
                format!(
                    "Schema requested while the resolver is {:?}.",
                    self.stage.get()
                ),
            ));
        }

        let schema = Schema::new(self.definitions, self.index);
        schema.validate_derivations()?;
        info!(definitions = schema.len(), "schema resolved");
        Ok(schema)
    }
}

/// Runs all resolution stages over `raw`.
pub fn resolve_schema(raw: &[RawDefinition]) -> Result<Schema, SchemaError> {
    let resolver = SchemaResolver::create(raw)?;
    resolver.resolve()?;
    resolver.finish()
}
