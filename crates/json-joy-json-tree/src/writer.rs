//! Token sink that builds nodes.

use async_trait::async_trait;
use json_joy_json_text::path::FrameKind;
use json_joy_json_text::{
    default_settings, AsyncJsonWrite, JsonError, JsonResult, JsonWrite, LoadSettings, Primitive,
    WriteAction, WriterState, WriterStateMachine,
};
use tracing::debug;

use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::node::{NodeId, NodeKind};

#[derive(Debug, Clone, Copy)]
struct Open {
    node: NodeId,
    /// Property created for `node` that the duplicate policy discarded;
    /// freed once `node` is closed.
    discarded: Option<NodeId>,
}

/// Materialises written tokens as nodes.
///
/// A writer from [`TreeWriter::new`] builds a single detached root,
/// available from [`root`](TreeWriter::root) once complete. A writer from
/// [`Document::create_writer`] appends into an existing container and
/// can never close it.
///
/// Tokens are validated by the same state machine as the text writer, so a
/// sequence the text writer rejects is rejected here too.
pub struct TreeWriter<'a> {
    doc: &'a mut Document,
    machine: WriterStateMachine,
    open: Vec<Open>,
    base_depth: usize,
    pending_name: Option<String>,
    root: Option<NodeId>,
    settings: LoadSettings,
    line_info: Option<(usize, usize)>,
}

impl<'a> TreeWriter<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        Self::with_settings(doc, default_settings().load)
    }

    /// Root-building writer; `settings` picks the duplicate policy and key
    /// comparison of the objects it creates.
    pub fn with_settings(doc: &'a mut Document, settings: LoadSettings) -> Self {
        Self {
            doc,
            machine: WriterStateMachine::new(),
            open: Vec::new(),
            base_depth: 0,
            pending_name: None,
            root: None,
            settings,
            line_info: None,
        }
    }

    /// The finished root, or the target container of an appending writer.
    pub fn root(&self) -> Option<NodeId> {
        match self.base_depth {
            0 => self.root,
            _ => self.open.first().map(|o| o.node),
        }
    }

    /// Whether everything opened through this writer has been closed and,
    /// for a root-building writer, a root exists.
    pub fn is_complete(&self) -> bool {
        let settled = self.machine.depth() == self.base_depth
            && !matches!(self.machine.state(), WriterState::Property | WriterState::Error);
        settled && (self.base_depth > 0 || self.root.is_some())
    }

    /// Line info to record on the next node created.
    pub fn set_line_info(&mut self, line_info: Option<(usize, usize)>) {
        self.line_info = line_info;
    }

    /// Poison the writer with a structural failure.
    fn guard<T>(&mut self, result: TreeResult<T>) -> JsonResult<T> {
        result.map_err(|err| {
            self.machine.fail(err.to_string());
            err.into()
        })
    }

    fn check_second_root(&mut self) -> JsonResult<()> {
        if self.open.is_empty() && self.root.is_some() {
            return Err(self.machine.fail("A root has already been written.".to_owned()).into());
        }
        Ok(())
    }

    /// Link a new node at the cursor. Returns the property that wraps it
    /// when the duplicate policy kept an existing property instead.
    fn attach(&mut self, node: NodeId) -> TreeResult<Option<NodeId>> {
        let line_info = self.line_info.take();
        if line_info.is_some() {
            self.doc.set_line_info(node, line_info)?;
        }
        let Some(top) = self.open.last().map(|o| o.node) else {
            self.root = Some(node);
            return Ok(None);
        };
        if self.doc.kind(top)? != NodeKind::Object {
            self.doc.add(top, node)?;
            return Ok(None);
        }
        let name = self.pending_name.take().unwrap_or_default();
        let previous = self.doc.property(top, &name);
        let property = self.doc.new_property(name, node)?;
        if line_info.is_some() {
            self.doc.set_line_info(property, line_info)?;
        }
        let len = self.doc.len(top);
        let inserted = self.doc.insert_with(
            top,
            len,
            property,
            Some(self.settings.duplicate_property_handling),
        );
        let linked = match inserted {
            Ok(linked) => linked,
            Err(err) => {
                self.doc.delete(property)?;
                return Err(err);
            }
        };
        if linked != property {
            return Ok(Some(property));
        }
        // A replaced property is unreachable once the writer moves on.
        if let Some(previous) = previous.filter(|&p| self.doc.parent(p).is_none()) {
            self.doc.delete(previous)?;
        }
        Ok(None)
    }

    /// Free a node whose attach failed, unless something still owns it.
    fn discard(&mut self, node: NodeId) {
        let orphan = self.doc.contains(node)
            && self.doc.parent(node).is_none()
            && self.root != Some(node);
        if orphan {
            if let Err(err) = self.doc.delete(node) {
                debug!(node = %node, %err, "could not free unattached node");
            }
        }
    }

    fn leaf(&mut self, value: Primitive) -> JsonResult<()> {
        self.check_second_root()?;
        self.machine.begin(WriteAction::Value)?;
        let node = self.doc.new_value(value);
        let attached = self.attach(node);
        if attached.is_err() {
            self.discard(node);
        }
        if let Some(discarded) = self.guard(attached)? {
            let freed = self.doc.delete(discarded);
            self.guard(freed)?;
        }
        Ok(())
    }

    fn start(&mut self, kind: NodeKind, name: &str) -> JsonResult<()> {
        self.check_second_root()?;
        let (action, node) = match kind {
            NodeKind::Object => {
                let duplicates = self.doc.settings().duplicate_property_handling;
                let object = self
                    .doc
                    .new_object_with(self.settings.property_name_comparison, duplicates);
                (WriteAction::StartObject, object)
            }
            NodeKind::Array => (WriteAction::StartArray, self.doc.new_array()),
            _ => (WriteAction::StartConstructor, self.doc.new_constructor(name)),
        };
        if let Err(err) = self.machine.begin(action) {
            let freed = self.doc.delete(node);
            self.guard(freed)?;
            return Err(err.into());
        }
        let attached = self.attach(node);
        if attached.is_err() {
            self.discard(node);
        }
        let discarded = self.guard(attached)?;
        self.open.push(Open { node, discarded });
        Ok(())
    }

    fn end(&mut self, kind: Option<FrameKind>) -> JsonResult<()> {
        if self.machine.depth() <= self.base_depth {
            return Err(self.machine.fail("No token to close.".to_owned()).into());
        }
        if self.machine.state() == WriterState::Property {
            self.leaf(Primitive::Null)?;
        }
        self.machine.end(kind)?;
        if let Some(Open {
            discarded: Some(discarded),
            ..
        }) = self.open.pop()
        {
            let freed = self.doc.delete(discarded);
            self.guard(freed)?;
        }
        Ok(())
    }
}

impl JsonWrite for TreeWriter<'_> {
    fn write_start_object(&mut self) -> JsonResult<()> {
        self.start(NodeKind::Object, "")
    }

    fn write_end_object(&mut self) -> JsonResult<()> {
        self.end(Some(FrameKind::Object))
    }

    fn write_start_array(&mut self) -> JsonResult<()> {
        self.start(NodeKind::Array, "")
    }

    fn write_end_array(&mut self) -> JsonResult<()> {
        self.end(Some(FrameKind::Array))
    }

    fn write_start_constructor(&mut self, name: &str) -> JsonResult<()> {
        self.start(NodeKind::Constructor, name)
    }

    fn write_end_constructor(&mut self) -> JsonResult<()> {
        self.end(Some(FrameKind::Constructor))
    }

    fn write_end(&mut self) -> JsonResult<()> {
        self.end(None)
    }

    fn write_property_name(&mut self, name: &str) -> JsonResult<()> {
        self.machine.begin_property(name)?;
        self.pending_name = Some(name.to_owned());
        Ok(())
    }

    fn write_value(&mut self, value: &Primitive) -> JsonResult<()> {
        match value {
            Primitive::Comment(text) => self.write_comment(text),
            Primitive::Raw(text) => self.write_raw_value(text),
            _ => self.leaf(value.clone()),
        }
    }

    /// Comments become nodes inside arrays and constructors; elsewhere
    /// they are dropped.
    fn write_comment(&mut self, text: &str) -> JsonResult<()> {
        self.machine.begin(WriteAction::Comment)?;
        let Some(top) = self.open.last().map(|o| o.node) else {
            return Ok(());
        };
        let kind = self.doc.kind(top);
        if !matches!(self.guard(kind)?, NodeKind::Array | NodeKind::Constructor) {
            return Ok(());
        }
        let node = self.doc.new_value(Primitive::Comment(text.to_owned()));
        let attached = self.attach(node);
        if attached.is_err() {
            self.discard(node);
        }
        self.guard(attached)?;
        Ok(())
    }

    /// Raw text that is not a value has no node form and is dropped.
    fn write_raw(&mut self, _text: &str) -> JsonResult<()> {
        self.machine.begin(WriteAction::Raw)?;
        Ok(())
    }

    fn write_raw_value(&mut self, text: &str) -> JsonResult<()> {
        self.leaf(Primitive::Raw(text.to_owned()))
    }

    fn flush(&mut self) -> JsonResult<()> {
        Ok(())
    }

    /// Close every container this writer opened.
    fn close(&mut self) -> JsonResult<()> {
        if matches!(self.machine.state(), WriterState::Closed | WriterState::Error) {
            self.machine.close();
            return Ok(());
        }
        while self.machine.depth() > self.base_depth {
            self.end(None)?;
        }
        self.machine.close();
        debug!(root = ?self.root(), "tree writer closed");
        Ok(())
    }

    fn path(&self) -> String {
        self.machine.path()
    }

    fn state(&self) -> WriterState {
        self.machine.state()
    }
}

/// Completes immediately; nothing is written to a stream.
#[async_trait]
impl AsyncJsonWrite for TreeWriter<'_> {
    async fn write_start_object_async(&mut self) -> JsonResult<()> {
        self.write_start_object()
    }

    async fn write_end_object_async(&mut self) -> JsonResult<()> {
        self.write_end_object()
    }

    async fn write_start_array_async(&mut self) -> JsonResult<()> {
        self.write_start_array()
    }

    async fn write_end_array_async(&mut self) -> JsonResult<()> {
        self.write_end_array()
    }

    async fn write_start_constructor_async(&mut self, name: &str) -> JsonResult<()> {
        self.write_start_constructor(name)
    }

    async fn write_end_constructor_async(&mut self) -> JsonResult<()> {
        self.write_end_constructor()
    }

    async fn write_end_async(&mut self) -> JsonResult<()> {
        self.write_end()
    }

    async fn write_property_name_async(&mut self, name: &str) -> JsonResult<()> {
        self.write_property_name(name)
    }

    async fn write_value_async(&mut self, value: &Primitive) -> JsonResult<()> {
        self.write_value(value)
    }

    async fn write_comment_async(&mut self, text: &str) -> JsonResult<()> {
        self.write_comment(text)
    }

    async fn write_raw_async(&mut self, text: &str) -> JsonResult<()> {
        self.write_raw(text)
    }

    async fn write_raw_value_async(&mut self, text: &str) -> JsonResult<()> {
        self.write_raw_value(text)
    }

    async fn flush_async(&mut self) -> JsonResult<()> {
        self.flush()
    }

    async fn close_async(&mut self) -> JsonResult<()> {
        self.close()
    }
}

impl Document {
    /// Writer appending into `container`. Paths it reports are relative to
    /// the document root.
    pub fn create_writer(&mut self, container: NodeId) -> TreeResult<TreeWriter<'_>> {
        let kind = self.kind(container)?;
        let action = match kind {
            NodeKind::Object => WriteAction::StartObject,
            NodeKind::Array => WriteAction::StartArray,
            NodeKind::Constructor => WriteAction::StartConstructor,
            found => {
                return Err(TreeError::WrongKind {
                    expected: "container",
                    found,
                })
            }
        };
        let mut machine = WriterStateMachine::with_base(self.compute_path(container));
        let existing = if kind == NodeKind::Object { 0 } else { self.len(container) };
        machine.begin(action).map_err(JsonError::from)?;
        for _ in 0..existing {
            machine.begin(WriteAction::Value).map_err(JsonError::from)?;
        }
        let settings = LoadSettings {
            property_name_comparison: self.comparison(container).unwrap_or_default(),
            ..default_settings().load
        };
        Ok(TreeWriter {
            doc: self,
            machine,
            open: vec![Open {
                node: container,
                discarded: None,
            }],
            base_depth: 1,
            pending_name: None,
            root: None,
            settings,
            line_info: None,
        })
    }
}
