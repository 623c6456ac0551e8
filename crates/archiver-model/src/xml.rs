//! XML model parsing.
//!
//! Every element becomes a [`ModelObject`] except `eAnnotations` subtrees,
//! which are folded into [`Annotation`]s on the owning object, and the
//! `xmi:XMI` wrapper element of multi-root documents.
//!
//! Namespace URIs declared with `xmlns` attributes are collected as well;
//! references into them address registered packages, not documents.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::diagnostic::Diagnostic;
use crate::location::Location;
use crate::object::{Annotation, ModelObject, Reference};

const ANNOTATION_ELEMENT: &str = "eAnnotations";
const DETAILS_ELEMENT: &str = "details";
const XMI_WRAPPER_ELEMENT: &str = "xmi:XMI";

/// Attributes that never hold cross-resource references.
const NON_REFERENCE_ATTRIBUTES: &[&str] = &[
    "xsi:type",
    "xsi:schemaLocation",
    "xmi:version",
    "xmi:id",
    "name",
    "documentation",
    "label",
    "description",
];

/// Objects and load errors of one parsed document.
pub(crate) struct ParsedModel {
    pub objects: Vec<ModelObject>,
    pub namespaces: Vec<Location>,
    pub errors: Vec<Diagnostic>,
}

enum Frame {
    Object(usize),
    Annotation { owner: usize, index: usize },
    Skipped,
}

struct ModelBuilder<'a> {
    location: &'a Location,
    objects: Vec<ModelObject>,
    namespaces: Vec<Location>,
    errors: Vec<Diagnostic>,
    stack: Vec<Frame>,
    root_count: usize,
    sibling_counts: HashMap<(usize, String), usize>,
}

pub(crate) fn parse_model(location: &Location, bytes: &[u8]) -> ParsedModel {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut builder = ModelBuilder {
        location,
        objects: Vec::new(),
        namespaces: Vec::new(),
        errors: Vec::new(),
        stack: Vec::new(),
        root_count: 0,
        sibling_counts: HashMap::new(),
    };
    let mut buf = Vec::new();

    loop {
        let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                let attributes = collect_attributes(&reader, &element, bytes, offset, &mut builder);
                let frame = builder.open(&element_name(&element), &attributes);
                builder.stack.push(frame);
            }
            Ok(Event::Empty(element)) => {
                let attributes = collect_attributes(&reader, &element, bytes, offset, &mut builder);
                builder.open(&element_name(&element), &attributes);
            }
            Ok(Event::End(_)) => {
                builder.stack.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                let position = usize::try_from(reader.error_position()).unwrap_or(offset);
                builder
                    .errors
                    .push(Diagnostic::at_offset(error.to_string(), bytes, position));
                break;
            }
        }
        buf.clear();
    }

    if builder.errors.is_empty() && !builder.stack.is_empty() {
        builder.errors.push(Diagnostic::at_offset(
            "unexpected end of document",
            bytes,
            bytes.len(),
        ));
    }

    ParsedModel {
        objects: builder.objects,
        namespaces: builder.namespaces,
        errors: builder.errors,
    }
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn collect_attributes(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    source: &[u8],
    offset: usize,
    builder: &mut ModelBuilder<'_>,
) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    for attribute in element.attributes() {
        let attribute = match attribute {
            Ok(attribute) => attribute,
            Err(error) => {
                builder
                    .errors
                    .push(Diagnostic::at_offset(error.to_string(), source, offset));
                continue;
            }
        };
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        match attribute.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => attributes.push((key, value.into_owned())),
            Err(error) => builder
                .errors
                .push(Diagnostic::at_offset(error.to_string(), source, offset)),
        }
    }
    attributes
}

fn attribute<'v>(attributes: &'v [(String, String)], key: &str) -> Option<&'v str> {
    attributes
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl ModelBuilder<'_> {
    fn open(&mut self, element: &str, attributes: &[(String, String)]) -> Frame {
        self.declare_namespaces(attributes);

        match self.stack.last() {
            Some(Frame::Annotation { owner, index }) => {
                if element == DETAILS_ELEMENT
                    && let Some(key) = attribute(attributes, "key")
                {
                    let value = attribute(attributes, "value").unwrap_or_default();
                    self.objects[*owner].annotations[*index]
                        .details
                        .insert(key.to_string(), value.to_string());
                }
                return Frame::Skipped;
            }
            Some(Frame::Skipped) => return Frame::Skipped,
            _ => {}
        }

        if element == XMI_WRAPPER_ELEMENT && self.stack.is_empty() {
            return Frame::Object(usize::MAX);
        }

        let parent = self.current_object();

        if element == ANNOTATION_ELEMENT {
            let Some(owner) = parent else {
                return Frame::Skipped;
            };
            let annotations = &mut self.objects[owner].annotations;
            annotations.push(Annotation {
                source: attribute(attributes, "source")
                    .unwrap_or_default()
                    .to_string(),
                details: Default::default(),
            });
            return Frame::Annotation {
                owner,
                index: annotations.len() - 1,
            };
        }

        let name = attribute(attributes, "name").map(str::to_string);
        let path = self.object_path(parent, element, name.as_deref());
        let references = attributes
            .iter()
            .filter(|(key, _)| {
                !key.starts_with("xmlns") && !NON_REFERENCE_ATTRIBUTES.contains(&key.as_str())
            })
            .flat_map(|(key, value)| references_in(self.location, key, value))
            .collect();

        self.objects.push(ModelObject {
            type_name: attribute(attributes, "xsi:type")
                .unwrap_or(element)
                .to_string(),
            name,
            id: attribute(attributes, "xmi:id")
                .or_else(|| attribute(attributes, "id"))
                .map(str::to_string),
            path,
            is_abstract: attribute(attributes, "abstract") == Some("true"),
            parent,
            annotations: Vec::new(),
            references,
        });
        Frame::Object(self.objects.len() - 1)
    }

    fn declare_namespaces(&mut self, attributes: &[(String, String)]) {
        let declared = attributes
            .iter()
            .filter(|(key, _)| key == "xmlns" || key.starts_with("xmlns:"))
            .filter_map(|(_, value)| Location::parse(value).ok());
        for namespace in declared {
            if !self.namespaces.contains(&namespace) {
                self.namespaces.push(namespace);
            }
        }
    }

    /// Nearest enclosing object; the XMI wrapper does not count.
    fn current_object(&self) -> Option<usize> {
        self.stack.iter().rev().find_map(|frame| match frame {
            Frame::Object(index) if *index != usize::MAX => Some(*index),
            _ => None,
        })
    }

    fn object_path(&mut self, parent: Option<usize>, element: &str, name: Option<&str>) -> String {
        let Some(parent) = parent else {
            let index = self.root_count;
            self.root_count += 1;
            return if index == 0 {
                "/".to_string()
            } else {
                format!("/{index}")
            };
        };
        let counter = self
            .sibling_counts
            .entry((parent, element.to_string()))
            .or_insert(0);
        let index = *counter;
        *counter += 1;
        let segment = match name {
            Some(name) => name.to_string(),
            None => format!("@{element}.{index}"),
        };
        format!("{}/{segment}", self.objects[parent].path)
    }
}

/// Extract the references held by one attribute value.
///
/// A whitespace separated token is a reference when it has a non-empty URI
/// part before `#`, or when the attribute is `href`. Type qualifiers such as
/// `ecore:EDataType` carry no `#` and are skipped, as are tokens that look
/// like plain words or unexpanded variables.
fn references_in(location: &Location, feature: &str, value: &str) -> Vec<Reference> {
    let mut references = Vec::new();
    for token in value.split_whitespace() {
        let (uri, fragment) = match token.split_once('#') {
            Some((uri, fragment)) => (uri, Some(fragment)),
            None if feature == "href" => (token, None),
            None => continue,
        };
        if uri.is_empty() || uri.contains("${") || !uri.contains(['.', '/', ':']) {
            continue;
        }
        match location.resolve(uri) {
            Ok(target) => references.push(Reference {
                feature: feature.to_string(),
                target,
                fragment: fragment
                    .filter(|fragment| !fragment.is_empty())
                    .map(str::to_string),
            }),
            Err(error) => tracing::debug!(%location, %error, "skipping unresolvable reference"),
        }
    }
    references
}
