//! Turns a template's static strings into a static node tree plus binding descriptors.
//!
//! The scanner is a small, forgiving subset of the HTML tokenizer that walks the strings character by character.
//! Whatever state it's in when one string ends decides what the binding between it and the next string is.

use crate::{
	dom::Namespace,
	error::{TemplateError, TemplateErrorKind},
	template::{Binding, PartKind, StaticNode, TemplateKind},
};
use core::mem;
use std::rc::Rc;
use tracing::warn;

pub(crate) struct Parsed {
	pub nodes: Vec<StaticNode>,
	pub bindings: Vec<Binding>,
}

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose content is text only, up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Raw text elements whose content also isn't entity-decoded.
const UNDECODED_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
	Double,
	Single,
	None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Text,
	TagOpen,
	TagName,
	EndTagOpen,
	EndTagName,
	SkipToTagEnd,
	BeforeAttributeName,
	AttributeName,
	AfterAttributeName,
	BeforeAttributeValue,
	AttributeValue(Quote),
	SelfClosing,
	MarkupDeclaration,
	Comment,
	BogusComment,
	RawText,
}

struct Open {
	name: String,
	namespace: Namespace,
	attributes: Vec<(String, String)>,
	children: Vec<StaticNode>,
	index_in_parent: usize,
}

struct PendingBinding {
	kind: PartKind,
	name: Option<String>,
	strings: Option<Rc<[String]>>,
}

struct Scanner {
	kind: TemplateKind,
	state: State,
	root: Vec<StaticNode>,
	stack: Vec<Open>,
	node_count: usize,
	bindings: Vec<Binding>,

	/// Text, comment or raw text content.
	buffer: String,
	tag_name: String,
	self_closing: bool,
	attributes: Vec<(String, String)>,
	attribute_name: String,
	attribute_value: String,
	/// Finished static segments of the current attribute's value, one per binding so far.
	attribute_statics: Vec<String>,
	pending: Vec<PendingBinding>,
	raw_text_bound: bool,

	string: usize,
	offset: usize,
}

pub(crate) fn parse(strings: &[&str], kind: TemplateKind) -> Result<Parsed, TemplateError> {
	let Some(last) = strings.last() else {
		return Err(TemplateError {
			kind: TemplateErrorKind::Empty,
			string: 0,
			offset: 0,
		});
	};

	let mut scanner = Scanner::new(kind);
	for (i, string) in strings.iter().enumerate() {
		scanner.string = i;
		for (offset, c) in string.char_indices() {
			scanner.offset = offset;
			scanner.step(c)?;
		}
		if i + 1 < strings.len() {
			scanner.offset = string.len();
			scanner.binding()?;
		}
	}
	scanner.offset = last.len();
	scanner.finish()
}

fn unescape(text: &str) -> String {
	htmlize::unescape(text).into_owned()
}

impl Scanner {
	fn new(kind: TemplateKind) -> Self {
		Self {
			kind,
			state: State::Text,
			root: Vec::new(),
			stack: Vec::new(),
			node_count: 0,
			bindings: Vec::new(),
			buffer: String::new(),
			tag_name: String::new(),
			self_closing: false,
			attributes: Vec::new(),
			attribute_name: String::new(),
			attribute_value: String::new(),
			attribute_statics: Vec::new(),
			pending: Vec::new(),
			raw_text_bound: false,
			string: 0,
			offset: 0,
		}
	}

	fn error(&self, kind: TemplateErrorKind) -> TemplateError {
		TemplateError {
			kind,
			string: self.string,
			offset: self.offset,
		}
	}

	/// Namespace of new children at the current position.
	fn namespace(&self) -> Namespace {
		match self.stack.last() {
			Some(open) if open.namespace == Namespace::Svg && open.name == "foreignObject" => Namespace::Html,
			Some(open) => open.namespace,
			None => self.kind.namespace(),
		}
	}

	fn children_mut(&mut self) -> &mut Vec<StaticNode> {
		match self.stack.last_mut() {
			Some(open) => &mut open.children,
			None => &mut self.root,
		}
	}

	fn next_path(&self) -> Box<[usize]> {
		let siblings = self.stack.last().map_or(self.root.len(), |open| open.children.len());
		self.stack
			.iter()
			.map(|open| open.index_in_parent)
			.chain(Some(siblings))
			.collect()
	}

	fn push_node(&mut self, node: StaticNode) -> usize {
		let index = self.node_count;
		self.node_count += 1;
		self.children_mut().push(node);
		index
	}

	fn flush_text(&mut self) {
		if !self.buffer.is_empty() {
			let text = unescape(&self.buffer);
			self.buffer.clear();
			self.push_node(StaticNode::Text(text));
		}
	}

	fn emit_comment(&mut self) {
		let comment = mem::take(&mut self.buffer);
		self.push_node(StaticNode::Comment(comment));
	}

	#[allow(clippy::too_many_lines)]
	fn step(&mut self, c: char) -> Result<(), TemplateError> {
		match self.state {
			State::Text => match c {
				'<' => self.state = State::TagOpen,
				c => self.buffer.push(c),
			},
			State::TagOpen => match c {
				c if c.is_ascii_alphabetic() => {
					self.flush_text();
					self.tag_name.push(c);
					self.state = State::TagName;
				}
				'/' => {
					self.flush_text();
					self.state = State::EndTagOpen;
				}
				'!' => {
					self.flush_text();
					self.state = State::MarkupDeclaration;
				}
				'?' => {
					self.flush_text();
					self.buffer.push(c);
					self.state = State::BogusComment;
				}
				c => {
					self.buffer.push('<');
					self.state = State::Text;
					return self.step(c);
				}
			},
			State::TagName => match c {
				c if c.is_ascii_whitespace() => self.state = State::BeforeAttributeName,
				'/' => self.state = State::SelfClosing,
				'>' => self.emit_start_tag(),
				c => self.tag_name.push(c),
			},
			State::EndTagOpen => match c {
				c if c.is_ascii_alphabetic() => {
					self.tag_name.push(c);
					self.state = State::EndTagName;
				}
				'>' => self.state = State::Text,
				c => {
					self.buffer.push(c);
					self.state = State::BogusComment;
				}
			},
			State::EndTagName => match c {
				'>' => {
					self.close_element();
					self.state = State::Text;
				}
				c if c.is_ascii_whitespace() || c == '/' => {
					self.close_element();
					self.state = State::SkipToTagEnd;
				}
				c => self.tag_name.push(c),
			},
			State::SkipToTagEnd => {
				if c == '>' {
					self.state = State::Text;
				}
			}
			State::BeforeAttributeName => match c {
				c if c.is_ascii_whitespace() => (),
				'/' => self.state = State::SelfClosing,
				'>' => self.emit_start_tag(),
				c => {
					self.attribute_name.push(c);
					self.state = State::AttributeName;
				}
			},
			State::AttributeName => match c {
				c if c.is_ascii_whitespace() => self.state = State::AfterAttributeName,
				'/' => {
					self.finish_attribute()?;
					self.state = State::SelfClosing;
				}
				'=' => self.state = State::BeforeAttributeValue,
				'>' => {
					self.finish_attribute()?;
					self.emit_start_tag();
				}
				c => self.attribute_name.push(c),
			},
			State::AfterAttributeName => match c {
				c if c.is_ascii_whitespace() => (),
				'/' => {
					self.finish_attribute()?;
					self.state = State::SelfClosing;
				}
				'=' => self.state = State::BeforeAttributeValue,
				'>' => {
					self.finish_attribute()?;
					self.emit_start_tag();
				}
				c => {
					self.finish_attribute()?;
					self.attribute_name.push(c);
					self.state = State::AttributeName;
				}
			},
			State::BeforeAttributeValue => match c {
				c if c.is_ascii_whitespace() => (),
				'"' => self.state = State::AttributeValue(Quote::Double),
				'\'' => self.state = State::AttributeValue(Quote::Single),
				'>' => {
					self.finish_attribute()?;
					self.emit_start_tag();
				}
				c => {
					self.attribute_value.push(c);
					self.state = State::AttributeValue(Quote::None);
				}
			},
			State::AttributeValue(quote) => match (quote, c) {
				(Quote::Double, '"') | (Quote::Single, '\'') => {
					self.finish_attribute()?;
					self.state = State::BeforeAttributeName;
				}
				(Quote::None, c) if c.is_ascii_whitespace() => {
					self.finish_attribute()?;
					self.state = State::BeforeAttributeName;
				}
				(Quote::None, '>') => {
					self.finish_attribute()?;
					self.emit_start_tag();
				}
				(_, c) => self.attribute_value.push(c),
			},
			State::SelfClosing => {
				if c == '>' {
					self.self_closing = true;
					self.emit_start_tag();
				} else {
					self.state = State::BeforeAttributeName;
					return self.step(c);
				}
			}
			State::MarkupDeclaration => {
				if c == '>' {
					self.emit_comment();
					self.state = State::Text;
				} else {
					self.buffer.push(c);
					if self.buffer == "--" {
						self.buffer.clear();
						self.state = State::Comment;
					} else if !"--".starts_with(self.buffer.as_str()) {
						self.state = State::BogusComment;
					}
				}
			}
			State::Comment => {
				self.buffer.push(c);
				if self.buffer.ends_with("-->") {
					self.buffer.truncate(self.buffer.len() - 3);
					self.emit_comment();
					self.state = State::Text;
				}
			}
			State::BogusComment => {
				if c == '>' {
					self.emit_comment();
					self.state = State::Text;
				} else {
					self.buffer.push(c);
				}
			}
			State::RawText => {
				if c == '>' || c == '/' || c.is_ascii_whitespace() {
					if let Some(end) = self.raw_text_end() {
						self.buffer.truncate(end);
						self.finish_raw_text()?;
						self.state = if c == '>' { State::Text } else { State::SkipToTagEnd };
						return Ok(());
					}
				}
				self.buffer.push(c);
			}
		}
		Ok(())
	}

	fn binding(&mut self) -> Result<(), TemplateError> {
		match self.state {
			State::Text => {
				self.flush_text();
				let path = self.next_path();
				let node_index = self.push_node(StaticNode::Marker);
				self.bindings.push(Binding {
					kind: PartKind::Child,
					node_index,
					path,
					name: None,
					strings: None,
				});
			}
			State::TagOpen | State::TagName => return Err(self.error(TemplateErrorKind::BindingInTagName)),
			State::EndTagOpen | State::EndTagName | State::SkipToTagEnd => {
				return Err(self.error(TemplateErrorKind::BindingInEndTag))
			}
			State::AttributeName => return Err(self.error(TemplateErrorKind::BindingInAttributeName)),
			State::MarkupDeclaration | State::Comment | State::BogusComment => {
				return Err(self.error(TemplateErrorKind::BindingInComment))
			}
			State::BeforeAttributeName | State::SelfClosing => {
				self.pending.push(PendingBinding {
					kind: PartKind::Element,
					name: None,
					strings: None,
				});
				self.state = State::BeforeAttributeName;
			}
			State::AfterAttributeName => {
				self.finish_attribute()?;
				self.pending.push(PendingBinding {
					kind: PartKind::Element,
					name: None,
					strings: None,
				});
				self.state = State::BeforeAttributeName;
			}
			State::BeforeAttributeValue => {
				self.attribute_statics.push(String::new());
				self.state = State::AttributeValue(Quote::None);
			}
			State::AttributeValue(_) => {
				let segment = mem::take(&mut self.attribute_value);
				self.attribute_statics.push(segment);
			}
			State::RawText => {
				if self.raw_text_bound || !self.buffer.is_empty() {
					let name = self.stack.last().map(|open| open.name.clone()).unwrap_or_default();
					return Err(self.error(TemplateErrorKind::PartialRawTextBinding(name)));
				}
				self.raw_text_bound = true;
				let path = self.next_path();
				let node_index = self.node_count;
				self.node_count += 1;
				self.bindings.push(Binding {
					kind: PartKind::RawText,
					node_index,
					path,
					name: None,
					strings: None,
				});
			}
		}
		Ok(())
	}

	fn finish_attribute(&mut self) -> Result<(), TemplateError> {
		let name = mem::take(&mut self.attribute_name);
		let value = mem::take(&mut self.attribute_value);

		if self.attribute_statics.is_empty() {
			if name.starts_with(['.', '?', '@']) {
				return Err(self.error(TemplateErrorKind::PrefixWithoutBinding(name)));
			}
			self.attributes.push((name, unescape(&value)));
			return Ok(());
		}

		let mut statics = mem::take(&mut self.attribute_statics);
		statics.push(value);
		let bare = statics.len() == 2 && statics.iter().all(String::is_empty);
		let (kind, bare_name) = match name.chars().next() {
			Some('.') => (PartKind::Property, &name[1..]),
			Some('?') => (PartKind::BooleanAttribute, &name[1..]),
			Some('@') => (PartKind::Event, &name[1..]),
			_ => (PartKind::Attribute, name.as_str()),
		};
		if matches!(kind, PartKind::BooleanAttribute | PartKind::Event) && !bare {
			return Err(self.error(TemplateErrorKind::InterpolatedBinding(name)));
		}
		self.pending.push(PendingBinding {
			kind,
			name: Some(bare_name.to_owned()),
			strings: (!bare).then(|| statics.iter().map(|segment| unescape(segment)).collect()),
		});
		Ok(())
	}

	fn emit_start_tag(&mut self) {
		let tag_name = mem::take(&mut self.tag_name);
		let namespace = match tag_name.to_ascii_lowercase().as_str() {
			"svg" => Namespace::Svg,
			"math" => Namespace::MathMl,
			_ => self.namespace(),
		};
		let html = namespace == Namespace::Html;
		let name = if html { tag_name.to_ascii_lowercase() } else { tag_name };

		let mut attributes: Vec<(String, String)> = Vec::with_capacity(self.attributes.len());
		for (attribute, value) in self.attributes.drain(..) {
			let attribute = if html { attribute.to_ascii_lowercase() } else { attribute };
			// Like the browser, the first of several same-named attributes wins.
			if attributes.iter().all(|(existing, _)| *existing != attribute) {
				attributes.push((attribute, value));
			}
		}

		let path = self.next_path();
		let index_in_parent = path.last().copied().unwrap_or_default();
		let node_index = self.node_count;
		self.node_count += 1;
		self.bindings.extend(self.pending.drain(..).map(|pending| Binding {
			kind: pending.kind,
			node_index,
			path: path.clone(),
			name: pending.name.map(|name| match pending.kind {
				PartKind::Attribute | PartKind::BooleanAttribute if html => name.to_ascii_lowercase(),
				_ => name,
			}),
			strings: pending.strings,
		}));

		let self_closing = mem::take(&mut self.self_closing);
		if (html && VOID_ELEMENTS.contains(&name.as_str())) || (self_closing && !html) {
			self.children_mut().push(StaticNode::Element {
				name,
				namespace,
				attributes,
				children: Vec::new(),
			});
			self.state = State::Text;
		} else {
			let raw_text = html && RAW_TEXT_ELEMENTS.contains(&name.as_str());
			self.stack.push(Open {
				name,
				namespace,
				attributes,
				children: Vec::new(),
				index_in_parent,
			});
			self.raw_text_bound = false;
			self.state = if raw_text { State::RawText } else { State::Text };
		}
	}

	fn close_element(&mut self) {
		let name = mem::take(&mut self.tag_name);
		match self.stack.iter().rposition(|open| open.name.eq_ignore_ascii_case(&name)) {
			Some(position) => {
				while self.stack.len() > position {
					self.pop_element();
				}
			}
			None => warn!("Ignoring unmatched end tag </{}>.", name),
		}
	}

	fn pop_element(&mut self) {
		if let Some(open) = self.stack.pop() {
			self.children_mut().push(StaticNode::Element {
				name: open.name,
				namespace: open.namespace,
				attributes: open.attributes,
				children: open.children,
			});
		}
	}

	/// Where the raw text ends, if the buffer ends with the current element's end tag opener.
	fn raw_text_end(&self) -> Option<usize> {
		let name = &self.stack.last()?.name;
		let start = self.buffer.len().checked_sub(name.len() + 2)?;
		let tail = self.buffer.get(start..)?;
		(tail.starts_with("</") && tail[2..].eq_ignore_ascii_case(name)).then_some(start)
	}

	fn finish_raw_text(&mut self) -> Result<(), TemplateError> {
		let content = mem::take(&mut self.buffer);
		let name = self.stack.last().map(|open| open.name.clone()).unwrap_or_default();
		if self.raw_text_bound {
			if !content.is_empty() {
				return Err(self.error(TemplateErrorKind::PartialRawTextBinding(name)));
			}
			// Its index was assigned along with the binding.
			self.children_mut().push(StaticNode::Text(String::new()));
		} else if !content.is_empty() {
			let text = if UNDECODED_ELEMENTS.contains(&name.as_str()) {
				content
			} else {
				unescape(&content)
			};
			self.push_node(StaticNode::Text(text));
		}
		self.raw_text_bound = false;
		self.pop_element();
		Ok(())
	}

	fn finish(mut self) -> Result<Parsed, TemplateError> {
		match self.state {
			State::Text => self.flush_text(),
			State::TagOpen => {
				self.buffer.push('<');
				self.flush_text();
			}
			State::RawText => self.finish_raw_text()?,
			State::SkipToTagEnd => (),
			State::MarkupDeclaration | State::Comment | State::BogusComment => {
				return Err(self.error(TemplateErrorKind::Unterminated("comment")))
			}
			State::TagName
			| State::EndTagOpen
			| State::EndTagName
			| State::BeforeAttributeName
			| State::AttributeName
			| State::AfterAttributeName
			| State::BeforeAttributeValue
			| State::AttributeValue(_)
			| State::SelfClosing => return Err(self.error(TemplateErrorKind::Unterminated("tag"))),
		}
		while !self.stack.is_empty() {
			self.pop_element();
		}
		Ok(Parsed {
			nodes: self.root,
			bindings: self.bindings,
		})
	}
}
