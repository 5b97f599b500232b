//! XML document parsing and path queries.
//!
//! The [`XmlProvider`] trait is the seam the XPath strategies and the
//! XPath update operator go through; [`SxdXmlProvider`] implements it on top
//! of `sxd-document` and `sxd-xpath`.

use sxd_document::{parser, writer::format_document};
use sxd_xpath::{nodeset::Node, Context, Factory, Value as XPathValue, XPath};
use thiserror::Error;
use tracing::debug;

use crate::value::XmlNode;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlError {
    #[error("Failed to parse XML document: {0}")]
    Parse(String),
    #[error("Invalid path query '{query}': {message}")]
    InvalidQuery { query: String, message: String },
    #[error("Failed to execute path query '{query}': {message}")]
    Execution { query: String, message: String },
    #[error("Cannot update node selected by '{query}': {message}")]
    Update { query: String, message: String },
}

pub type XmlResult<T> = Result<T, XmlError>;

/// Shape requested from a path query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    Node,
    NodeSet,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Node(Option<XmlNode>),
    NodeSet(Vec<XmlNode>),
    String(String),
}

#[mockall::automock]
pub trait XmlProvider: Send + Sync {
    /// Parses `document`, then evaluates `query` against its root.
    fn query(&self, document: &str, query: &str, shape: QueryShape) -> XmlResult<QueryResult>;

    /// Replaces the text of every node selected by `query` and returns the
    /// serialized document.
    fn update(&self, document: &str, query: &str, text: &str) -> XmlResult<String>;
}

#[derive(Debug, Default)]
pub struct SxdXmlProvider;

impl SxdXmlProvider {
    pub fn new() -> Self {
        Self
    }

    fn compile(query: &str) -> XmlResult<XPath> {
        Factory::new()
            .build(query)
            .map_err(|e| XmlError::InvalidQuery {
                query: query.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| XmlError::InvalidQuery {
                query: query.to_string(),
                message: "query is empty".to_string(),
            })
    }

    fn to_xml_node(node: &Node) -> XmlNode {
        let name = node
            .expanded_name()
            .map(|name| name.local_part().to_string())
            .unwrap_or_default();
        XmlNode::new(name, node.string_value())
    }
}

impl XmlProvider for SxdXmlProvider {
    fn query(&self, document: &str, query: &str, shape: QueryShape) -> XmlResult<QueryResult> {
        let package = parser::parse(document).map_err(|e| XmlError::Parse(format!("{:?}", e)))?;
        let document = package.as_document();
        let xpath = Self::compile(query)?;
        let context = Context::new();
        let value = xpath
            .evaluate(&context, document.root())
            .map_err(|e| XmlError::Execution {
                query: query.to_string(),
                message: e.to_string(),
            })?;
        debug!("path query {} evaluated", query);

        match shape {
            QueryShape::String => Ok(QueryResult::String(value.string())),
            QueryShape::Node => match value {
                XPathValue::Nodeset(nodes) => Ok(QueryResult::Node(
                    nodes.document_order_first().map(|n| Self::to_xml_node(&n)),
                )),
                _ => Err(XmlError::Execution {
                    query: query.to_string(),
                    message: "query does not select nodes".to_string(),
                }),
            },
            QueryShape::NodeSet => match value {
                XPathValue::Nodeset(nodes) => Ok(QueryResult::NodeSet(
                    nodes
                        .document_order()
                        .iter()
                        .map(Self::to_xml_node)
                        .collect(),
                )),
                _ => Err(XmlError::Execution {
                    query: query.to_string(),
                    message: "query does not select nodes".to_string(),
                }),
            },
        }
    }

    fn update(&self, document: &str, query: &str, text: &str) -> XmlResult<String> {
        let package = parser::parse(document).map_err(|e| XmlError::Parse(format!("{:?}", e)))?;
        let doc = package.as_document();
        let xpath = Self::compile(query)?;
        let context = Context::new();
        let value = xpath
            .evaluate(&context, doc.root())
            .map_err(|e| XmlError::Execution {
                query: query.to_string(),
                message: e.to_string(),
            })?;
        let nodes = match value {
            XPathValue::Nodeset(nodes) => nodes.document_order(),
            _ => {
                return Err(XmlError::Update {
                    query: query.to_string(),
                    message: "query does not select nodes".to_string(),
                })
            }
        };

        for node in nodes {
            match node {
                Node::Element(element) => {
                    element.clear_children();
                    element.append_child(doc.create_text(text));
                }
                Node::Attribute(attribute) => {
                    if let Some(parent) = attribute.parent() {
                        parent.set_attribute_value(attribute.name(), text);
                    }
                }
                Node::Text(node) => node.set_text(text),
                other => {
                    return Err(XmlError::Update {
                        query: query.to_string(),
                        message: format!("unsupported node {:?}", other),
                    })
                }
            }
        }

        let mut output = Vec::new();
        format_document(&doc, &mut output).map_err(|e| XmlError::Update {
            query: query.to_string(),
            message: e.to_string(),
        })?;
        String::from_utf8(output).map_err(|e| XmlError::Update {
            query: query.to_string(),
            message: e.to_string(),
        })
    }
}
