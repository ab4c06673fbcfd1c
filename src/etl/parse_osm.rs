use std::str;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::data::geo::GeoPoint;
use crate::data::osm::{Bounds, Node, Way};
use crate::data::OsmMapData;
use crate::errors::ParseError;

enum ParserState {
    Top,
    Node,
    Way(Way),
    Relation,
}

struct OsmParser {
    state: ParserState,
    data: OsmMapData,
    depth: usize,
    seen_root: bool,
    seen_bounds: bool,
}

fn attribute(el: &BytesStart, key: &[u8]) -> Result<Option<String>, ParseError> {
    for attribute in el.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == key {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_float(el: &BytesStart, key: &[u8]) -> Result<f64, ParseError> {
    let value = attribute(el, key)?.ok_or_else(|| {
        ParseError::Malformed(format!("bounds lacks attribute {}", String::from_utf8_lossy(key)))
    })?;
    Ok(value.trim().parse()?)
}

impl OsmParser {
    fn new() -> Self {
        OsmParser {
            state: ParserState::Top,
            data: OsmMapData::default(),
            depth: 0,
            seen_root: false,
            seen_bounds: false,
        }
    }

    fn parse_bounds(el: &BytesStart) -> Result<Bounds, ParseError> {
        Ok(Bounds {
            min_lat: required_float(el, b"minlat")?,
            min_lon: required_float(el, b"minlon")?,
            max_lat: required_float(el, b"maxlat")?,
            max_lon: required_float(el, b"maxlon")?,
        })
    }

    /// Nodes lacking a usable id or position are dropped with a warning.
    fn parse_node(el: &BytesStart) -> Result<Option<Node>, ParseError> {
        let id = attribute(el, b"id")?;
        let lat = attribute(el, b"lat")?.and_then(|v| v.trim().parse::<f64>().ok());
        let lon = attribute(el, b"lon")?.and_then(|v| v.trim().parse::<f64>().ok());
        match (id, lat, lon) {
            (Some(id), Some(lat), Some(lon)) => Ok(Some(Node {
                id,
                point: GeoPoint::new(lat, lon),
            })),
            (id, _, _) => {
                warn!(
                    node = id.unwrap_or_default().as_str();
                    "Skipping node without id or position"
                );
                Ok(None)
            }
        }
    }

    fn finish_way(&mut self, way: Way) {
        if way.id.is_empty() {
            warn!(refs = way.node_refs.len(); "Skipping way without id");
            return;
        }
        self.data.ways.push(way);
    }

    fn open(&mut self, el: &BytesStart, empty: bool) -> Result<(), ParseError> {
        self.seen_root = true;
        match el.name().as_ref() {
            b"bounds" => {
                self.data.bounds = Self::parse_bounds(el)?;
                self.seen_bounds = true;
            }
            b"node" => {
                if let Some(node) = Self::parse_node(el)? {
                    self.data.nodes.insert(node.id.clone(), node);
                }
                if !empty {
                    self.state = ParserState::Node;
                }
            }
            b"way" => {
                let way = Way {
                    id: attribute(el, b"id")?.unwrap_or_default(),
                    ..Way::default()
                };
                if empty {
                    self.finish_way(way);
                } else {
                    self.state = ParserState::Way(way);
                }
            }
            b"relation" => {
                if !empty {
                    self.state = ParserState::Relation;
                }
            }
            b"nd" => {
                if let ParserState::Way(way) = &mut self.state {
                    if let Some(node_ref) = attribute(el, b"ref")? {
                        way.node_refs.push(node_ref);
                    }
                }
            }
            b"tag" => {
                if let ParserState::Way(way) = &mut self.state {
                    if let (Some(key), Some(value)) = (attribute(el, b"k")?, attribute(el, b"v")?) {
                        // Later duplicates replace earlier ones.
                        way.tags.insert(key, value);
                    }
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"way" => {
                let state = std::mem::replace(&mut self.state, ParserState::Top);
                if let ParserState::Way(way) = state {
                    self.finish_way(way);
                }
            }
            b"node" | b"relation" => self.state = ParserState::Top,
            _ => (),
        }
    }
}

/// Parses an OSM XML payload. The payload must be well-formed and carry a
/// `bounds` element; anything else is fatal for the whole payload.
pub fn parse(payload: &[u8]) -> Result<OsmMapData, ParseError> {
    let mut reader = Reader::from_reader(payload);
    reader.trim_text(true);
    let mut parser = OsmParser::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                parser.depth += 1;
                parser.open(&e, false)?;
            }
            Event::Empty(e) => parser.open(&e, true)?,
            Event::End(e) => {
                parser.depth = parser.depth.checked_sub(1).ok_or_else(|| {
                    ParseError::Malformed("unbalanced closing tag".to_string())
                })?;
                parser.close(e.name().as_ref());
            }
            Event::Text(e) => {
                if parser.depth == 0 {
                    return Err(ParseError::Malformed(
                        "text outside of the root element".to_string(),
                    ));
                }
                debug!(bytes = e.len(); "Ignoring text content");
            }
            // Declarations, comments, CDATA, processing instructions, doctype.
            _ => (),
        }
        // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
        buf.clear();
    }

    if parser.depth != 0 {
        return Err(ParseError::Malformed("unexpected end of document".to_string()));
    }
    if !parser.seen_root {
        return Err(ParseError::Malformed("empty document".to_string()));
    }
    if !parser.seen_bounds {
        return Err(ParseError::Malformed("missing bounds element".to_string()));
    }
    Ok(parser.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <bounds minlat="50.0" minlon="11.0" maxlat="50.01" maxlon="11.01"/>
  <node id="1" lat="50.005" lon="11.005"/>
  <node id="2" lat="50.006" lon="11.006">
    <tag k="amenity" v="bench"/>
  </node>
  <node id="3" lon="11.0"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
    <tag k="name" v="First"/>
    <tag k="name" v="Main Street &amp; Co"/>
  </way>
  <way id="11"/>
  <relation id="20">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>"#;

    #[test]
    fn parses_bounds_nodes_and_ways() {
        let data = parse(PAYLOAD.as_bytes()).unwrap();

        assert_eq!(
            data.bounds,
            Bounds {
                min_lat: 50.0,
                min_lon: 11.0,
                max_lat: 50.01,
                max_lon: 11.01
            }
        );
        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.nodes["2"].point, GeoPoint::new(50.006, 11.006));
        assert_eq!(data.ways.len(), 2);

        let way = &data.ways[0];
        assert_eq!(way.id, "10");
        assert_eq!(way.node_refs, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(way.tags["name"], "Main Street & Co");
        assert_eq!(way.tags.len(), 2);
        assert!(data.ways[1].is_untagged());
    }

    #[test]
    fn relation_tags_do_not_leak_into_ways() {
        let data = parse(PAYLOAD.as_bytes()).unwrap();
        assert!(data.ways.iter().all(|w| !w.tags.contains_key("type")));
    }

    #[test]
    fn missing_bounds_is_fatal() {
        let result = parse(br#"<osm><node id="1" lat="1" lon="2"/></osm>"#);
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn truncated_document_is_fatal() {
        let truncated = &PAYLOAD.as_bytes()[..PAYLOAD.len() - 20];
        assert!(matches!(parse(truncated), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn mismatched_tags_are_fatal() {
        let payload = br#"<osm><bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/></way></osm>"#;
        let result = parse(payload);
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn non_xml_is_fatal() {
        assert!(matches!(parse(b"this is not xml"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse(b""), Err(ParseError::Malformed(_))));
    }
}
