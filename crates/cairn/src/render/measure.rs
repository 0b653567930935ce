//! The measure pass: block state in, rows of measurables out.
//!
//! Measurement is a pure function of the workspace. It allocates no DOM-like
//! state and touches nothing mutable, so two consecutive passes over the same
//! block produce identical geometry.

use cairn_core::geometry::{Point, Size};
use cairn_model::{
    Connection, BlockId, FieldKind, HatKind, InputKind, OutputShape, PortRef, Workspace,
};

use crate::{error::CairnError, render::constants::ConstantProvider};

/// What one measurable on a row is.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Field {
        name: String,
        kind: FieldKind,
        text: String,
    },
    ValueSocket {
        input: String,
        shape: OutputShape,
        connected: bool,
    },
    StatementSocket {
        input: String,
    },
}

/// One measured element: its content, box, and position relative to the
/// block origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurable {
    pub element: Element,
    /// Top-left corner, block-relative.
    pub offset: Point,
    pub size: Size,
    /// Vertical centerline within the row.
    pub centerline: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Hat,
    Body,
    Statement,
}

/// One horizontal band of the block.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Measurable>,
}

/// An attachable point of the measured block, block-relative, with the
/// drop-target cue flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPosition {
    pub port: PortRef,
    pub point: Point,
    /// True iff this is a value socket whose check accepts only Boolean.
    pub highlight: bool,
}

/// Where an attached child block's origin sits, block-relative.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPlacement {
    pub input: String,
    pub origin: Point,
}

/// The measured geometry of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInfo {
    block: BlockId,
    kind: String,
    category: String,
    hat: HatKind,
    output_shape: Option<OutputShape>,
    is_shadow: bool,
    has_previous: bool,
    has_next: bool,
    size: Size,
    rows: Vec<Row>,
    connections: Vec<ConnectionPosition>,
    sockets: Vec<SocketPlacement>,
}

enum ProtoRow {
    Body(Vec<(Element, Size)>),
    Statement { input: String, child: Size },
}

impl RenderInfo {
    /// Measures a block and everything attached below and inside it.
    pub fn measure(
        ws: &Workspace,
        id: &BlockId,
        constants: &ConstantProvider,
    ) -> Result<RenderInfo, CairnError> {
        let block = ws
            .get(id)
            .ok_or_else(|| CairnError::MissingBlock(id.clone()))?;
        let hat = block.hat();
        let padding = constants.padding();

        // First pass: group elements into proto-rows, recursing into
        // attached children for socket sizes.
        let mut proto: Vec<ProtoRow> = Vec::new();
        let mut current: Vec<(Element, Size)> = Vec::new();
        for input in block.inputs() {
            for field in input.fields() {
                current.push((
                    Element::Field {
                        name: field.name().to_string(),
                        kind: field.kind().clone(),
                        text: field.value().to_string(),
                    },
                    constants.field_size(field),
                ));
            }
            match input.kind() {
                InputKind::Statement => {
                    if !current.is_empty() {
                        proto.push(ProtoRow::Body(std::mem::take(&mut current)));
                    }
                    let child = match input.connection().and_then(Connection::target) {
                        Some(target) => {
                            // The wrap spans the whole attached substack, not
                            // just its first block.
                            let mut stack = Size::default();
                            let mut cursor = Some(target.block.clone());
                            while let Some(link) = cursor {
                                let info = Self::measure(ws, &link, constants)?;
                                stack = stack.merge_vertical(info.size);
                                cursor = ws
                                    .connection_at(&PortRef::next(link))
                                    .and_then(Connection::target)
                                    .map(|t| t.block.clone());
                            }
                            stack
                        }
                        None => Size::new(
                            constants.notch_width() + 2.0 * padding,
                            constants.min_row_height(),
                        ),
                    };
                    proto.push(ProtoRow::Statement {
                        input: input.name().to_string(),
                        child,
                    });
                }
                InputKind::Value => {
                    let conn = input.connection();
                    let connected = conn.is_some_and(Connection::is_attached);
                    let boolean_only = conn.is_some_and(Connection::accepts_only_boolean);
                    let (size, shape) = match conn.and_then(Connection::target) {
                        Some(target) => {
                            let child = Self::measure(ws, &target.block, constants)?;
                            let shape = child.output_shape.unwrap_or_default();
                            (child.size, shape)
                        }
                        None => {
                            let shape = if boolean_only {
                                OutputShape::Hexagonal
                            } else {
                                OutputShape::Round
                            };
                            (constants.empty_socket_size(shape), shape)
                        }
                    };
                    current.push((
                        Element::ValueSocket {
                            input: input.name().to_string(),
                            shape,
                            connected,
                        },
                        size,
                    ));
                }
                InputKind::Dummy => {}
            }
        }
        if !current.is_empty() || proto.is_empty() {
            proto.push(ProtoRow::Body(current));
        }

        // Second pass: lay the rows out.
        let indent = constants.statement_indent(hat);
        let mut body_width: f32 = constants.min_block_width();
        let mut rows = Vec::with_capacity(proto.len() + 1);
        for row in &proto {
            match row {
                ProtoRow::Body(elements) => {
                    let mut width = padding;
                    for (_, size) in elements {
                        width += size.width() + padding;
                    }
                    body_width = body_width.max(width);
                }
                ProtoRow::Statement { child, .. } => {
                    // The bowler owns its full width, so wrapped substacks
                    // count towards it; elsewhere children overhang the
                    // right edge.
                    if hat == HatKind::Bowler {
                        body_width = body_width.max(indent + child.width());
                    }
                }
            }
        }

        let mut y = 0.0;
        match hat {
            HatKind::Cap => {
                body_width = body_width.max(constants.cap_hat_width());
                rows.push(Row {
                    kind: RowKind::Hat,
                    y,
                    width: constants.cap_hat_width(),
                    height: constants.cap_hat_height(),
                    elements: Vec::new(),
                });
                // The cap keeps the usual gap below it.
                y += constants.cap_hat_height() + padding;
            }
            HatKind::Bowler => {
                // The bowler's width follows the widest row, wrapped
                // substacks included, and the first body row sits directly
                // under it.
                let hat_width = body_width + 2.0 * constants.bowler_side_padding();
                body_width = body_width.max(hat_width);
                rows.push(Row {
                    kind: RowKind::Hat,
                    y,
                    width: hat_width,
                    height: constants.bowler_hat_height(),
                    elements: Vec::new(),
                });
                y += constants.bowler_hat_height();
            }
            HatKind::None => {}
        }

        let mut sockets = Vec::new();
        for row in proto {
            match row {
                ProtoRow::Body(elements) => {
                    let tallest = elements
                        .iter()
                        .map(|(_, size)| size.height())
                        .fold(0.0, f32::max);
                    let height = constants.min_row_height().max(tallest + 2.0 * padding);
                    let mut x = padding;
                    let mut measured = Vec::with_capacity(elements.len());
                    for (element, size) in elements {
                        let centerline = match &element {
                            Element::Field { kind, .. } => constants.field_centerline(
                                kind,
                                hat,
                                block.category(),
                                height,
                            ),
                            _ => height / 2.0,
                        };
                        let offset = Point::new(x, y + centerline - size.height() / 2.0);
                        if let Element::ValueSocket { input, .. } = &element {
                            sockets.push(SocketPlacement {
                                input: input.clone(),
                                origin: offset,
                            });
                        }
                        let advance = size.width() + padding;
                        measured.push(Measurable {
                            element,
                            offset,
                            size,
                            centerline,
                        });
                        x += advance;
                    }
                    rows.push(Row {
                        kind: RowKind::Body,
                        y,
                        width: x.max(constants.min_block_width()),
                        height,
                        elements: measured,
                    });
                    y += height;
                }
                ProtoRow::Statement { input, child } => {
                    let height = child.height().max(constants.min_row_height());
                    let origin = Point::new(indent, y);
                    sockets.push(SocketPlacement {
                        input: input.clone(),
                        origin,
                    });
                    let socket = Measurable {
                        element: Element::StatementSocket {
                            input: input.clone(),
                        },
                        offset: origin,
                        size: child,
                        centerline: height / 2.0,
                    };
                    let min_width = indent + constants.notch_width() + 2.0 * padding;
                    rows.push(Row {
                        kind: RowKind::Statement,
                        y,
                        width: (indent + child.width()).max(min_width),
                        height,
                        elements: vec![socket],
                    });
                    y += height;
                }
            }
        }

        let size = Size::new(body_width, y);

        let mut connections = Vec::new();
        if block.previous_connection().is_some() {
            connections.push(ConnectionPosition {
                port: PortRef::previous(id.clone()),
                point: Point::new(constants.notch_offset(), 0.0),
                highlight: false,
            });
        }
        if block.next_connection().is_some() {
            connections.push(ConnectionPosition {
                port: PortRef::next(id.clone()),
                point: Point::new(constants.notch_offset(), size.height()),
                highlight: false,
            });
        }
        if block.output_connection().is_some() {
            connections.push(ConnectionPosition {
                port: PortRef::output(id.clone()),
                point: Point::new(0.0, size.height() / 2.0),
                highlight: false,
            });
        }
        for row in &rows {
            for measurable in &row.elements {
                match &measurable.element {
                    Element::ValueSocket { input, .. } => {
                        let highlight = block
                            .input(input)
                            .and_then(|i| i.connection())
                            .is_some_and(Connection::accepts_only_boolean);
                        connections.push(ConnectionPosition {
                            port: PortRef::input(id.clone(), input.clone()),
                            point: Point::new(
                                measurable.offset.x(),
                                row.y + row.height / 2.0,
                            ),
                            highlight,
                        });
                    }
                    Element::StatementSocket { input } => {
                        connections.push(ConnectionPosition {
                            port: PortRef::input(id.clone(), input.clone()),
                            point: Point::new(indent + constants.notch_offset(), row.y),
                            highlight: false,
                        });
                    }
                    Element::Field { .. } => {}
                }
            }
        }

        Ok(RenderInfo {
            block: id.clone(),
            kind: block.kind().to_string(),
            category: block.category().to_string(),
            hat,
            output_shape: block.output_connection().map(|_| block.output_shape()),
            is_shadow: block.is_shadow(),
            has_previous: block.previous_connection().is_some(),
            has_next: block.next_connection().is_some(),
            size,
            rows,
            connections,
            sockets,
        })
    }

    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn hat(&self) -> HatKind {
        self.hat
    }

    /// `Some` for value blocks, with their silhouette.
    pub fn output_shape(&self) -> Option<OutputShape> {
        self.output_shape
    }

    pub fn is_shadow(&self) -> bool {
        self.is_shadow
    }

    pub fn has_previous(&self) -> bool {
        self.has_previous
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn connections(&self) -> &[ConnectionPosition] {
        &self.connections
    }

    pub fn sockets(&self) -> &[SocketPlacement] {
        &self.sockets
    }

    /// The hat row, if the block has one.
    pub fn hat_row(&self) -> Option<&Row> {
        self.rows.first().filter(|row| row.kind == RowKind::Hat)
    }
}
