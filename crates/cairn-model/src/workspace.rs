//! The workspace: arena owner of the block graph.
//!
//! All structural operations go through the workspace so that the two ends
//! of every connection stay symmetric. Operations are synchronous and
//! non-reentrant: a connect or disconnect fully completes, including its
//! change notification, before the next structural call is issued.

use std::{collections::HashSet, rc::Rc};

use indexmap::IndexMap;
use log::{debug, trace, warn};
use rand::RngExt;

use crate::{
    block::{Block, BlockId},
    connection::{Connection, Port, PortRef},
    error::ModelError,
    event::{ChangeEvent, EventLog},
    mutation::{Mutation, MutationForm},
    registry::Registry,
    serialize::{IdPolicy, SerializedBlock, SerializedInput},
};

/// Character soup for generated block ids. Excludes quotes and backslash so
/// ids embed cleanly in serialized text.
const ID_SOUP: &str = "!#$%()*+,-./:;=?@[]^_`{|}~ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ID_LENGTH: usize = 20;

/// Outcome of a procedure-signature propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureUpdate {
    /// The prototype and the given number of call sites were rewritten.
    /// Call sites whose serialized form was already identical are not
    /// counted.
    Updated { call_sites: usize },
    /// No definition exists for the procedure identifier. A recoverable
    /// authoring-time inconsistency, surfaced to the user, not an error.
    MissingDefinition,
}

/// Owner of all blocks in one editing surface.
pub struct Workspace {
    blocks: IndexMap<BlockId, Block>,
    registry: Rc<Registry>,
    events: EventLog,
    /// Ids owned by a paired flyout workspace; fresh ids avoid these too.
    reserved_ids: HashSet<BlockId>,
    selected: Option<BlockId>,
}

impl Workspace {
    pub fn new(registry: Rc<Registry>) -> Self {
        Self {
            blocks: IndexMap::new(),
            registry,
            events: EventLog::new(),
            reserved_ids: HashSet::new(),
            selected: None,
        }
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    // ---- lookup ----------------------------------------------------------

    /// Read accessor; a miss is an absent result, not an error.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks, in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Blocks without a parent, in creation order. Each heads a stack or
    /// floats alone.
    pub fn top_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values().filter(|block| block.parent().is_none())
    }

    fn block(&self, id: &BlockId) -> Result<&Block, ModelError> {
        self.blocks
            .get(id)
            .ok_or_else(|| ModelError::MissingBlock(id.clone()))
    }

    fn block_mut(&mut self, id: &BlockId) -> Result<&mut Block, ModelError> {
        self.blocks
            .get_mut(id)
            .ok_or_else(|| ModelError::MissingBlock(id.clone()))
    }

    /// Resolves a port reference to its connection.
    pub fn connection_at(&self, port: &PortRef) -> Option<&Connection> {
        self.blocks
            .get(&port.block)
            .and_then(|block| block.connection(&port.port))
    }

    fn connection(&self, port: &PortRef) -> Result<&Connection, ModelError> {
        self.block(&port.block)?
            .connection(&port.port)
            .ok_or_else(|| ModelError::NoConnection(port.clone()))
    }

    fn set_target(&mut self, port: &PortRef, target: Option<PortRef>) -> Result<(), ModelError> {
        self.block_mut(&port.block)?
            .connection_mut(&port.port)
            .ok_or_else(|| ModelError::NoConnection(port.clone()))?
            .set_target(target);
        Ok(())
    }

    // ---- selection -------------------------------------------------------

    pub fn select(&mut self, id: &BlockId) -> Result<(), ModelError> {
        self.block(id)?;
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn selection(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    // ---- events ----------------------------------------------------------

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<crate::event::Recorded> {
        self.events.drain()
    }

    /// Runs `f` inside one change-group so observers see its events as a
    /// single atomic action.
    pub fn group<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.events.begin_group();
        let result = f(self);
        self.events.end_group();
        result
    }

    // ---- ids -------------------------------------------------------------

    /// Marks an id as taken by the paired flyout so fresh ids avoid it.
    pub fn reserve_id(&mut self, id: BlockId) {
        self.reserved_ids.insert(id);
    }

    fn id_in_use(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id) || self.reserved_ids.contains(id)
    }

    fn fresh_id(&self) -> BlockId {
        loop {
            let id = BlockId::new(random_id());
            if !self.id_in_use(&id) {
                return id;
            }
        }
    }

    // ---- creation and disposal -------------------------------------------

    /// Creates a block of a registered kind with a fresh id, applies the
    /// descriptor defaults, runs the behavior init hook, and attaches the
    /// default shadow blocks.
    pub fn create_block(&mut self, kind: &str) -> Result<BlockId, ModelError> {
        let id = self.fresh_id();
        self.create_block_with_id(kind, id, true)
    }

    fn create_block_with_id(
        &mut self,
        kind: &str,
        id: BlockId,
        spawn_defaults: bool,
    ) -> Result<BlockId, ModelError> {
        let descriptor = self
            .registry
            .get(kind)
            .ok_or_else(|| ModelError::UnknownKind(kind.to_string()))?;
        if self.id_in_use(&id) {
            return Err(ModelError::DuplicateId(id));
        }

        let block = descriptor.instantiate(id.clone())?;
        let has_mutation = block.mutation().is_some();
        self.blocks.insert(id.clone(), block);
        self.events.record(ChangeEvent::BlockCreated {
            id: id.clone(),
            kind: kind.to_string(),
        });
        debug!(block_id = id.as_str(), kind; "created block");

        if has_mutation {
            self.reconcile_mutation_inputs(&id)?;
        }
        if spawn_defaults {
            self.attach_default_shadows(&id)?;
        }
        Ok(id)
    }

    /// Disposes a block and its entire subtree, children first.
    ///
    /// With `heal_stack`, the blocks above and below in a statement stack
    /// are reconnected; otherwise the stack is left split.
    pub fn dispose(&mut self, id: &BlockId, heal_stack: bool) -> Result<(), ModelError> {
        self.dispose_inner(id, heal_stack, true)
    }

    fn dispose_inner(
        &mut self,
        id: &BlockId,
        heal_stack: bool,
        respawn: bool,
    ) -> Result<(), ModelError> {
        self.block(id)?;
        self.unplug_inner(id, heal_stack, respawn)?;

        // Children must be fully disposed before the parent leaves the
        // index, or their upward connections would dangle.
        let children = self.child_ids(id)?;
        for child in children {
            self.dispose_inner(&child, false, false)?;
        }

        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.blocks.shift_remove(id);
        self.events.record(ChangeEvent::BlockDeleted { id: id.clone() });
        debug!(block_id = id.as_str(); "disposed block");
        Ok(())
    }

    fn child_ids(&self, id: &BlockId) -> Result<Vec<BlockId>, ModelError> {
        let block = self.block(id)?;
        let mut children = Vec::new();
        for input in block.inputs() {
            if let Some(target) = input.connection().and_then(Connection::target) {
                children.push(target.block.clone());
            }
        }
        if let Some(target) = block.next_connection().and_then(Connection::target) {
            children.push(target.block.clone());
        }
        Ok(children)
    }

    // ---- connecting ------------------------------------------------------

    /// Connects two complementary connections and records the change.
    ///
    /// A real block connecting over a default shadow replaces it: the shadow
    /// is serialized into the connection's respawn template and disposed.
    pub fn connect(&mut self, a: PortRef, b: PortRef) -> Result<(), ModelError> {
        if a.block == b.block {
            return Err(ModelError::SelfConnection(a.block));
        }
        let a_kind = self.connection(&a)?.kind();
        let b_kind = self.connection(&b)?.kind();
        if !a_kind.complements(b_kind) {
            return Err(ModelError::IncompatibleKinds {
                a: a_kind,
                b: b_kind,
            });
        }
        let (superior, inferior) = if a_kind.is_superior() { (a, b) } else { (b, a) };

        {
            let sup_conn = self.connection(&superior)?;
            let inf_conn = self.connection(&inferior)?;
            if !sup_conn.checks_intersect(inf_conn) {
                return Err(ModelError::IncompatibleChecks {
                    a: superior,
                    b: inferior,
                });
            }
            if inf_conn.is_attached() {
                return Err(ModelError::AlreadyConnected(inferior));
            }
        }

        if let Some(existing) = self.connection(&superior)?.target().cloned() {
            let existing_is_shadow = self.block(&existing.block)?.is_shadow();
            let incoming_is_shadow = self.block(&inferior.block)?.is_shadow();
            if existing_is_shadow && !incoming_is_shadow {
                // Keep the shadow's current state as the respawn template,
                // then make room for the real block.
                let template = self.serialize_block(&existing.block)?;
                self.block_mut(&superior.block)?
                    .connection_mut(&superior.port)
                    .ok_or_else(|| ModelError::NoConnection(superior.clone()))?
                    .set_shadow_template(Some(template));
                self.dispose_inner(&existing.block.clone(), false, false)?;
            } else {
                return Err(ModelError::AlreadyConnected(superior));
            }
        }

        self.set_target(&superior, Some(inferior.clone()))?;
        self.set_target(&inferior, Some(superior.clone()))?;
        trace!(superior:% = superior, inferior:% = inferior; "connected");
        self.events.record(ChangeEvent::Connected { superior, inferior });
        Ok(())
    }

    /// Removes the symmetric link at `port`. If the parent side carries a
    /// shadow template, a fresh shadow is respawned into the empty socket.
    pub fn disconnect(&mut self, port: &PortRef) -> Result<(), ModelError> {
        self.disconnect_inner(port, true)
    }

    fn disconnect_inner(&mut self, port: &PortRef, respawn: bool) -> Result<(), ModelError> {
        let target = self
            .connection(port)?
            .target()
            .cloned()
            .ok_or_else(|| ModelError::NotConnected(port.clone()))?;

        self.set_target(port, None)?;
        self.set_target(&target, None)?;

        let (superior, inferior) = if self.connection(port)?.kind().is_superior() {
            (port.clone(), target)
        } else {
            (target, port.clone())
        };
        trace!(superior:% = superior, inferior:% = inferior; "disconnected");
        self.events.record(ChangeEvent::Disconnected {
            superior: superior.clone(),
            inferior,
        });

        if respawn {
            let template = self.connection(&superior)?.shadow_template().cloned();
            if let Some(template) = template {
                self.spawn_shadow(&superior, template)?;
            }
        }
        Ok(())
    }

    /// Detaches a block from its parent.
    ///
    /// For a statement block in the middle of a stack, `heal_stack` splices
    /// the blocks above and below back together and the unplugged block
    /// comes out alone; without healing the block keeps its next chain and
    /// heads its own stack.
    pub fn unplug(&mut self, id: &BlockId, heal_stack: bool) -> Result<(), ModelError> {
        self.unplug_inner(id, heal_stack, true)
    }

    fn unplug_inner(
        &mut self,
        id: &BlockId,
        heal_stack: bool,
        respawn: bool,
    ) -> Result<(), ModelError> {
        let block = self.block(id)?;

        if block
            .output_connection()
            .is_some_and(Connection::is_attached)
        {
            self.disconnect_inner(&PortRef::output(id.clone()), respawn)?;
            return Ok(());
        }

        let parent_port = block
            .previous_connection()
            .and_then(Connection::target)
            .cloned();
        if let Some(parent_port) = parent_port {
            self.disconnect_inner(&PortRef::previous(id.clone()), respawn)?;
            if heal_stack {
                let below = self
                    .block(id)?
                    .next_connection()
                    .and_then(Connection::target)
                    .cloned();
                if let Some(below) = below {
                    self.disconnect_inner(&PortRef::next(id.clone()), false)?;
                    self.connect(parent_port, below)?;
                }
            }
        }
        Ok(())
    }

    // ---- shadows ---------------------------------------------------------

    fn attach_default_shadows(&mut self, id: &BlockId) -> Result<(), ModelError> {
        let pending: Vec<(PortRef, SerializedBlock)> = self
            .block(id)?
            .inputs()
            .iter()
            .filter_map(|input| {
                let conn = input.connection()?;
                if conn.is_attached() {
                    return None;
                }
                let template = conn.shadow_template()?.clone();
                Some((PortRef::input(id.clone(), input.name()), template))
            })
            .collect();

        for (port, template) in pending {
            self.spawn_shadow(&port, template)?;
        }
        Ok(())
    }

    /// Loads a shadow block from a template (with fresh ids) and attaches it
    /// to the given parent-side connection.
    fn spawn_shadow(
        &mut self,
        port: &PortRef,
        mut template: SerializedBlock,
    ) -> Result<(), ModelError> {
        {
            let blocks = &self.blocks;
            let reserved = &self.reserved_ids;
            template.reassign_ids(&mut || loop {
                let id = random_id();
                let candidate = BlockId::new(id.clone());
                if !blocks.contains_key(&candidate) && !reserved.contains(&candidate) {
                    break id;
                }
            });
        }
        let child = self.load_node(&template, true)?;
        let child_port = if self.block(&child)?.output_connection().is_some() {
            PortRef::output(child)
        } else {
            PortRef::previous(child)
        };
        self.connect(port.clone(), child_port)
    }

    // ---- fields ----------------------------------------------------------

    /// Read accessor for a field value; a miss is an absent result.
    pub fn field_value(&self, id: &BlockId, field: &str) -> Option<&str> {
        self.blocks.get(id)?.field(field).map(|f| f.value())
    }

    /// Sets a field's value. Unlike the read accessor, a missing field here
    /// is a hard failure.
    pub fn set_field_value(
        &mut self,
        id: &BlockId,
        field: &str,
        value: &str,
    ) -> Result<(), ModelError> {
        let block = self.block_mut(id)?;
        let slot = block.field_mut(field).ok_or_else(|| ModelError::MissingField {
            block: id.clone(),
            field: field.to_string(),
        })?;
        let old = slot.value().to_string();
        if old == value {
            return Ok(());
        }
        slot.set_value(value);
        self.events.record(ChangeEvent::FieldChanged {
            block: id.clone(),
            field: field.to_string(),
            old,
            new: value.to_string(),
        });
        Ok(())
    }

    // ---- mutations -------------------------------------------------------

    /// Applies a serialized mutation form to a block.
    ///
    /// Returns `false` without firing an event when the block's current form
    /// is textually identical, so redundant undo entries never appear. On a
    /// real change the input list is reconciled: same-named inputs keep
    /// their children, removed inputs detach theirs, and added value inputs
    /// receive fresh default shadows.
    pub fn set_mutation(
        &mut self,
        id: &BlockId,
        form: &MutationForm,
    ) -> Result<bool, ModelError> {
        let block = self.block(id)?;
        if block.mutation().is_none() {
            return Err(ModelError::MutationUnsupported(block.kind().to_string()));
        }
        let new_mutation = Mutation::from_form(form)?;
        let old_form = block.mutation().map(Mutation::to_form);
        let new_form = new_mutation.to_form();
        if old_form
            .as_ref()
            .is_some_and(|old| old.canonical_text() == new_form.canonical_text())
        {
            return Ok(false);
        }

        self.block_mut(id)?.set_mutation_raw(Some(new_mutation));
        self.reconcile_mutation_inputs(id)?;
        self.attach_default_shadows(id)?;
        self.events.record(ChangeEvent::MutationChanged {
            block: id.clone(),
            old: old_form,
            new: new_form,
        });
        Ok(true)
    }

    /// Rebuilds a block's input list to match its current mutation.
    ///
    /// Inputs whose names survive keep their connections and fields
    /// untouched; disappearing inputs drop their shadows and set real
    /// children free as top-level stacks.
    fn reconcile_mutation_inputs(&mut self, id: &BlockId) -> Result<(), ModelError> {
        let block = self.block(id)?;
        let Some(mutation) = block.mutation().cloned() else {
            return Ok(());
        };
        let descriptor = self
            .registry
            .get(block.kind())
            .ok_or_else(|| ModelError::UnknownKind(block.kind().to_string()))?;
        let desired = mutation.build_inputs(descriptor.inputs());
        let desired_names: HashSet<&str> = desired.iter().map(|spec| spec.name()).collect();

        // Detach whatever hangs off inputs that are going away.
        let doomed: Vec<(String, Option<(BlockId, bool)>)> = block
            .inputs()
            .iter()
            .filter(|input| !desired_names.contains(input.name()))
            .map(|input| {
                let attached = input
                    .connection()
                    .and_then(Connection::target)
                    .map(|target| target.block.clone())
                    .map(|child| {
                        let is_shadow =
                            self.blocks.get(&child).is_some_and(Block::is_shadow);
                        (child, is_shadow)
                    });
                (input.name().to_string(), attached)
            })
            .collect();
        for (input_name, attached) in doomed {
            if let Some((child, is_shadow)) = attached {
                if is_shadow {
                    self.dispose_inner(&child, false, false)?;
                } else {
                    self.disconnect_inner(&PortRef::input(id.clone(), input_name), false)?;
                }
            }
        }

        let mut old_inputs = self.block_mut(id)?.take_inputs();
        let mut rebuilt = Vec::with_capacity(desired.len());
        for spec in &desired {
            match old_inputs.iter().position(|input| input.name() == spec.name()) {
                Some(pos) => {
                    // A surviving input keeps its connection and children,
                    // but its fields follow the new form: label text derived
                    // from the mutation would otherwise go stale.
                    let mut kept = old_inputs.remove(pos);
                    kept.set_fields(spec.fields().to_vec());
                    rebuilt.push(kept);
                }
                None => rebuilt.push(spec.build()),
            }
        }
        self.block_mut(id)?.set_inputs(rebuilt);
        trace!(block_id = id.as_str(), inputs = desired.len(); "reconciled mutation inputs");
        Ok(())
    }

    /// Propagates a procedure-signature mutation to the prototype and every
    /// call site sharing the identifier, as one atomic change-group.
    ///
    /// Blocks whose serialized form is unchanged are skipped. A missing
    /// definition is a soft outcome, not an error.
    pub fn propagate_procedure_mutation(
        &mut self,
        proccode: &str,
        form: &MutationForm,
    ) -> Result<ProcedureUpdate, ModelError> {
        match Mutation::from_form(form)? {
            Mutation::Procedure { .. } => {}
            _ => {
                return Err(ModelError::MalformedMutation(
                    "expected a procedure mutation".to_string(),
                ));
            }
        }

        let matches_proccode = |block: &Block| {
            matches!(
                block.mutation(),
                Some(Mutation::Procedure { proccode: code, .. }) if code == proccode
            )
        };
        let prototype = self
            .blocks
            .values()
            .find(|block| block.kind() == "procedures_prototype" && matches_proccode(block))
            .map(|block| block.id().clone());
        let Some(prototype) = prototype else {
            warn!(proccode; "no definition found for procedure; leaving call sites untouched");
            return Ok(ProcedureUpdate::MissingDefinition);
        };
        let call_sites: Vec<BlockId> = self
            .blocks
            .values()
            .filter(|block| block.kind() == "procedures_call" && matches_proccode(block))
            .map(|block| block.id().clone())
            .collect();

        self.group(|ws| {
            ws.set_mutation(&prototype, form)?;
            let mut updated = 0;
            for id in &call_sites {
                if ws.set_mutation(id, form)? {
                    updated += 1;
                }
            }
            Ok(ProcedureUpdate::Updated {
                call_sites: updated,
            })
        })
    }

    // ---- serialization ---------------------------------------------------

    /// Serializes a block and its subtree into the boundary form.
    pub fn serialize_block(&self, id: &BlockId) -> Result<SerializedBlock, ModelError> {
        let block = self.block(id)?;
        let mut serialized = SerializedBlock {
            id: block.id().as_str().to_string(),
            kind: block.kind().to_string(),
            mutation: block.mutation().map(Mutation::to_form),
            fields: Default::default(),
            inputs: Default::default(),
            next: None,
        };

        for input in block.inputs() {
            for field in input.fields() {
                if field.kind().is_serializable() {
                    serialized
                        .fields
                        .insert(field.name().to_string(), field.value().to_string());
                }
            }
            let Some(conn) = input.connection() else {
                continue;
            };
            let mut slot = SerializedInput::default();
            if let Some(target) = conn.target() {
                let child = self.block(&target.block)?;
                let child_form = Box::new(self.serialize_block(child.id())?);
                if child.is_shadow() {
                    slot.shadow = Some(child_form);
                } else {
                    slot.block = Some(child_form);
                    slot.shadow = conn.shadow_template().cloned().map(Box::new);
                }
            } else if let Some(template) = conn.shadow_template() {
                slot.shadow = Some(Box::new(template.clone()));
            }
            if slot.block.is_some() || slot.shadow.is_some() {
                serialized.inputs.insert(input.name().to_string(), slot);
            }
        }

        if let Some(target) = block.next_connection().and_then(Connection::target) {
            serialized.next = Some(Box::new(self.serialize_block(&target.block)?));
        }
        Ok(serialized)
    }

    /// Loads a serialized block (and subtree) into this workspace and
    /// returns the root id.
    pub fn load_block(
        &mut self,
        serialized: &SerializedBlock,
        policy: IdPolicy,
    ) -> Result<BlockId, ModelError> {
        let mut serialized = serialized.clone();
        if policy == IdPolicy::Fresh {
            let blocks = &self.blocks;
            let reserved = &self.reserved_ids;
            serialized.reassign_ids(&mut || loop {
                let id = random_id();
                let candidate = BlockId::new(id.clone());
                if !blocks.contains_key(&candidate) && !reserved.contains(&candidate) {
                    break id;
                }
            });
        }
        self.load_node(&serialized, false)
    }

    fn load_node(
        &mut self,
        serialized: &SerializedBlock,
        shadow: bool,
    ) -> Result<BlockId, ModelError> {
        let id = if serialized.id.is_empty() {
            self.fresh_id()
        } else {
            BlockId::new(serialized.id.clone())
        };
        let id = self.create_block_with_id(&serialized.kind, id, false)?;

        if shadow {
            self.block_mut(&id)?.set_shadow(true);
        }

        if let Some(form) = &serialized.mutation {
            let mutation = Mutation::from_form(form)?;
            self.block_mut(&id)?.set_mutation_raw(Some(mutation));
            self.reconcile_mutation_inputs(&id)?;
        }

        for (name, value) in &serialized.fields {
            let block = self.block_mut(&id)?;
            let field = block.field_mut(name).ok_or_else(|| ModelError::MissingField {
                block: id.clone(),
                field: name.clone(),
            })?;
            field.set_value(value);
        }

        // The serialized form is the complete picture of this block's
        // sockets: descriptor templates are dropped and rebuilt from data so
        // a load/serialize cycle is byte-stable.
        let input_names: Vec<String> = self
            .block(&id)?
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        for name in &input_names {
            if let Some(conn) = self
                .block_mut(&id)?
                .connection_mut(&Port::input(name.clone()))
            {
                conn.set_shadow_template(None);
            }
        }

        for (name, slot) in &serialized.inputs {
            if self.block(&id)?.input(name).is_none() {
                return Err(ModelError::MissingInput {
                    block: id.clone(),
                    input: name.clone(),
                });
            }
            let port = PortRef::input(id.clone(), name.clone());
            if let Some(shadow_form) = &slot.shadow {
                self.block_mut(&id)?
                    .connection_mut(&port.port)
                    .ok_or_else(|| ModelError::NoConnection(port.clone()))?
                    .set_shadow_template(Some((**shadow_form).clone()));
            }
            if let Some(child) = &slot.block {
                let child_id = self.load_node(child, false)?;
                let child_port = self.inferior_port(&child_id)?;
                self.connect(port, child_port)?;
            } else if let Some(shadow_form) = &slot.shadow {
                let child_id = self.load_node(shadow_form, true)?;
                let child_port = self.inferior_port(&child_id)?;
                self.connect(port, child_port)?;
            }
        }

        if let Some(next) = &serialized.next {
            let child_id = self.load_node(next, false)?;
            self.connect(PortRef::next(id.clone()), PortRef::previous(child_id))?;
        }
        Ok(id)
    }

    fn inferior_port(&self, id: &BlockId) -> Result<PortRef, ModelError> {
        let block = self.block(id)?;
        if block.output_connection().is_some() {
            Ok(PortRef::output(id.clone()))
        } else {
            Ok(PortRef::previous(id.clone()))
        }
    }
}

fn random_id() -> String {
    let mut rng = rand::rng();
    let soup: Vec<char> = ID_SOUP.chars().collect();
    (0..ID_LENGTH)
        .map(|_| soup[rng.random_range(0..soup.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog, input::Field};

    fn workspace() -> Workspace {
        Workspace::new(Rc::new(catalog::standard()))
    }

    fn stack_block(ws: &mut Workspace) -> BlockId {
        ws.create_block("control_wait").unwrap()
    }

    #[test]
    fn test_create_unknown_kind_is_an_error() {
        let mut ws = workspace();
        assert_eq!(
            ws.create_block("no_such_kind"),
            Err(ModelError::UnknownKind("no_such_kind".to_string()))
        );
    }

    #[test]
    fn test_connect_is_symmetric() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b.clone()))
            .unwrap();

        let a_next = ws.connection_at(&PortRef::next(a.clone())).unwrap();
        let b_prev = ws.connection_at(&PortRef::previous(b.clone())).unwrap();
        assert_eq!(a_next.target(), Some(&PortRef::previous(b.clone())));
        assert_eq!(b_prev.target(), Some(&PortRef::next(a.clone())));
        assert_eq!(ws.get(&b).unwrap().parent(), Some(&a));
    }

    #[test]
    fn test_disconnect_clears_both_sides() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b.clone()))
            .unwrap();
        ws.disconnect(&PortRef::next(a.clone())).unwrap();

        assert!(!ws.connection_at(&PortRef::next(a)).unwrap().is_attached());
        assert!(!ws
            .connection_at(&PortRef::previous(b))
            .unwrap()
            .is_attached());
    }

    #[test]
    fn test_disconnect_unconnected_is_an_error() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        assert!(matches!(
            ws.disconnect(&PortRef::next(a)),
            Err(ModelError::NotConnected(_))
        ));
    }

    #[test]
    fn test_incompatible_kinds_refuse_to_connect() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        assert!(matches!(
            ws.connect(PortRef::next(a.clone()), PortRef::next(b.clone())),
            Err(ModelError::IncompatibleKinds { .. })
        ));
        assert!(matches!(
            ws.connect(PortRef::previous(a), PortRef::previous(b)),
            Err(ModelError::IncompatibleKinds { .. })
        ));
    }

    #[test]
    fn test_type_checks_must_intersect() {
        let mut ws = workspace();
        let condition = ws.create_block("operator_equals").unwrap();
        let number = ws.create_block("math_number").unwrap();
        let if_block = ws.create_block("control_if").unwrap();

        // CONDITION only accepts Boolean.
        assert!(matches!(
            ws.connect(
                PortRef::input(if_block.clone(), "CONDITION"),
                PortRef::output(number),
            ),
            Err(ModelError::IncompatibleChecks { .. })
        ));
        ws.connect(
            PortRef::input(if_block, "CONDITION"),
            PortRef::output(condition),
        )
        .unwrap();
    }

    #[test]
    fn test_no_fan_out() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        let c = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b.clone()))
            .unwrap();
        assert!(matches!(
            ws.connect(PortRef::next(a), PortRef::previous(c.clone())),
            Err(ModelError::AlreadyConnected(_))
        ));
        assert!(matches!(
            ws.connect(PortRef::next(c), PortRef::previous(b)),
            Err(ModelError::AlreadyConnected(_))
        ));
    }

    #[test]
    fn test_unplug_with_heal_splices_the_stack() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        let c = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b.clone()))
            .unwrap();
        ws.connect(PortRef::next(b.clone()), PortRef::previous(c.clone()))
            .unwrap();

        ws.unplug(&b, true).unwrap();

        // A → C, with B alone.
        assert_eq!(
            ws.connection_at(&PortRef::next(a)).unwrap().target(),
            Some(&PortRef::previous(c))
        );
        assert!(ws.get(&b).unwrap().parent().is_none());
        assert!(!ws
            .connection_at(&PortRef::next(b))
            .unwrap()
            .is_attached());
    }

    #[test]
    fn test_unplug_without_heal_keeps_the_tail() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        let c = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b.clone()))
            .unwrap();
        ws.connect(PortRef::next(b.clone()), PortRef::previous(c.clone()))
            .unwrap();

        ws.unplug(&b, false).unwrap();

        // A alone; B still heads B → C.
        assert!(!ws.connection_at(&PortRef::next(a)).unwrap().is_attached());
        assert_eq!(
            ws.connection_at(&PortRef::next(b.clone())).unwrap().target(),
            Some(&PortRef::previous(c))
        );
        assert!(ws.get(&b).unwrap().parent().is_none());
    }

    #[test]
    fn test_dispose_removes_subtree_children_first() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b.clone()))
            .unwrap();

        ws.dispose(&a, false).unwrap();
        assert!(ws.get(&a).is_none());
        assert!(ws.get(&b).is_none());

        let deletions: Vec<&BlockId> = ws
            .events()
            .records()
            .iter()
            .filter_map(|r| match &r.event {
                ChangeEvent::BlockDeleted { id } => Some(id),
                _ => None,
            })
            .collect();
        // Each wait block takes its duration shadow down with it, and every
        // child's deletion is recorded before its parent's.
        assert_eq!(deletions.len(), 4);
        let position = |id: &BlockId| deletions.iter().position(|d| *d == id).unwrap();
        assert!(position(&b) < position(&a));
        assert_eq!(position(&a), deletions.len() - 1);
    }

    #[test]
    fn test_dispose_clears_selection() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        ws.select(&a).unwrap();
        ws.dispose(&a, false).unwrap();
        assert!(ws.selection().is_none());
    }

    #[test]
    fn test_shadow_replaced_by_real_block_and_respawned() {
        let mut ws = workspace();
        let say = ws.create_block("looks_say").unwrap();
        // The MESSAGE input starts occupied by a text shadow.
        let shadow_id = ws
            .connection_at(&PortRef::input(say.clone(), "MESSAGE"))
            .unwrap()
            .target()
            .unwrap()
            .block
            .clone();
        assert!(ws.get(&shadow_id).unwrap().is_shadow());

        let real = ws.create_block("operator_equals").unwrap();
        ws.connect(
            PortRef::input(say.clone(), "MESSAGE"),
            PortRef::output(real.clone()),
        )
        .unwrap();

        // The shadow was disposed, not orphaned.
        assert!(ws.get(&shadow_id).is_none());

        // Pulling the real block back out respawns a fresh shadow.
        ws.disconnect(&PortRef::input(say.clone(), "MESSAGE")).unwrap();
        let respawned = ws
            .connection_at(&PortRef::input(say, "MESSAGE"))
            .unwrap()
            .target()
            .unwrap()
            .block
            .clone();
        assert!(ws.get(&respawned).unwrap().is_shadow());
        assert_ne!(respawned, shadow_id);
    }

    #[test]
    fn test_set_field_value_on_missing_field_is_hard_failure() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        assert!(matches!(
            ws.set_field_value(&a, "NO_SUCH_FIELD", "x"),
            Err(ModelError::MissingField { .. })
        ));
        assert_eq!(ws.field_value(&a, "NO_SUCH_FIELD"), None);
    }

    #[test]
    fn test_identical_mutation_form_fires_no_event() {
        let mut ws = workspace();
        let if_block = ws.create_block("control_if").unwrap();
        let before = ws.events().len();

        let same = Mutation::Branches { count: 1 }.to_form();
        assert!(!ws.set_mutation(&if_block, &same).unwrap());
        assert_eq!(ws.events().len(), before);
    }

    #[test]
    fn test_mutation_refreshes_derived_label_text() {
        let mut ws = workspace();
        let prototype = ws.create_block("procedures_prototype").unwrap();
        let renamed = Mutation::Procedure {
            proccode: "renamed procedure".to_string(),
            params: Vec::new(),
            warp: false,
        };
        assert!(ws.set_mutation(&prototype, &renamed.to_form()).unwrap());

        let labels: Vec<&str> = ws
            .get(&prototype)
            .unwrap()
            .input("LABEL")
            .unwrap()
            .fields()
            .iter()
            .map(Field::value)
            .collect();
        assert_eq!(labels, vec!["renamed procedure"]);
    }

    #[test]
    fn test_top_blocks_excludes_attached_blocks() {
        let mut ws = workspace();
        let a = stack_block(&mut ws);
        let b = stack_block(&mut ws);
        ws.connect(PortRef::next(a.clone()), PortRef::previous(b))
            .unwrap();
        let tops: Vec<&BlockId> = ws.top_blocks().map(Block::id).collect();
        assert_eq!(tops, vec![&a]);
    }
}
