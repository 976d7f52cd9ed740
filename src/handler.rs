//! Search handlers and their registry.
//!
//! A handler turns a positional argument array into a JSON table of Hacker
//! News hits. Every handler is described by a static [`HandlerDefinition`]
//! (parameter layout, endpoint, property map, empty-value policy) and run by
//! one of two strategies:
//!
//! - [`BatchHandler`]: one upstream page, the whole table buffered and
//!   written once. Upstream failures collapse into
//!   [`HnError::HandlerFailed`].
//! - [`StreamingHandler`]: pages fetched on demand, each row written as soon
//!   as it is projected.

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::Value;
use url::Url;

use crate::error::{HnError, HnResult, OutputError};
use crate::fetch::{PageCursor, fetch_single};
use crate::http::Transport;
use crate::output::JsonArrayWriter;
use crate::params::{
    ParamKind, ParamSpec, PropertiesFirstArgs, PropertySelection, RunConfig, SearchFirstArgs,
    parse_input,
};
use crate::property::{EmptyValue, Property, PropertyMap, Row};
use crate::query::{ContentTag, Endpoint, SearchQuery};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Order of the positional parameters.
#[derive(Debug, Clone, Copy)]
pub enum ArgLayout {
    /// `[search, properties?]`
    SearchFirst,
    /// `[properties?, <search>, config?]`
    PropertiesFirst { search: ParamSpec },
}

/// Static description of a handler.
#[derive(Debug, Clone, Copy)]
pub struct HandlerDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub layout: ArgLayout,
    pub endpoint: Endpoint,
    pub tag: ContentTag,
    pub properties: PropertyMap,
    pub empty_value: EmptyValue,
    pub examples: &'static [&'static str],
}

impl HandlerDefinition {
    pub fn params(&self) -> Vec<ParamSpec> {
        match self.layout {
            ArgLayout::SearchFirst => SearchFirstArgs::PARAMS.to_vec(),
            ArgLayout::PropertiesFirst { search } => vec![
                PropertiesFirstArgs::PROPERTIES,
                search,
                PropertiesFirstArgs::CONFIG,
            ],
        }
    }

    /// Validate positional arguments into a request.
    pub fn parse_request(&self, args: &[Value]) -> HnResult<QueryRequest> {
        match self.layout {
            ArgLayout::SearchFirst => {
                let args = SearchFirstArgs::parse(args)?;
                Ok(QueryRequest {
                    search_term: args.search,
                    properties: args.properties,
                    config: RunConfig::default(),
                })
            }
            ArgLayout::PropertiesFirst { search } => {
                let args = PropertiesFirstArgs::parse(args, &search)?;
                Ok(QueryRequest {
                    search_term: args.search,
                    properties: args.properties,
                    config: args.config,
                })
            }
        }
    }

    pub fn query(&self, request: &QueryRequest) -> SearchQuery {
        SearchQuery::new(self.endpoint, self.tag, request.search_term.clone())
    }
}

/// A validated handler request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub search_term: String,
    pub properties: PropertySelection,
    pub config: RunConfig,
}

const FILTER: ParamSpec = ParamSpec {
    name: "filter",
    kind: ParamKind::Text,
    required: false,
    default: Some(""),
    description: "Search query to determine the rows to return",
};

const SEARCH: ParamSpec = ParamSpec {
    name: "search",
    kind: ParamKind::Text,
    required: true,
    default: None,
    description: "Search query to determine the rows to return",
};

const COMMENT_SEARCH_PROPERTIES: &[Property] = &[
    Property::new("title", "title", "The title of the story"),
    Property::new("url", "url", "The url of the story"),
    Property::new("author", "author", "The user who made the comment"),
    Property::new("comment", "comment_text", "The comment text"),
    Property::new("parent_id", "parent_id", "The parent id"),
    Property::new("created_at", "created_at", "The date the comment was created"),
];

pub const SEARCH_COMMENTS: HandlerDefinition = HandlerDefinition {
    name: "hackernews-comments",
    title: "Hacker News Comments",
    description: "Returns the Hacker News comments matching the search term",
    layout: ArgLayout::PropertiesFirst { search: FILTER },
    endpoint: Endpoint::Relevance,
    tag: ContentTag::Comment,
    properties: PropertyMap::new(COMMENT_SEARCH_PROPERTIES),
    empty_value: EmptyValue::Null,
    examples: &[r#"["*", "microsoft"]"#, r#"["author,comment", "google", "limit=250"]"#],
};

const COMMENT_LIST_PROPERTIES: &[Property] = &[
    Property::new("title", "story_title", "The title of the story"),
    Property::new("url", "story_url", "The url of the story"),
    Property::new("author", "author", "The user who made the comment"),
    Property::new("comment", "comment_text", "The comment text"),
    Property::new("parent_id", "parent_id", "The parent id"),
    Property::new("created_at", "created_at", "The date the comment was created"),
];

pub const LIST_COMMENTS: HandlerDefinition = HandlerDefinition {
    name: "hackernews-list-comments",
    title: "Hacker News List Comments",
    description: "Returns the 100 most recent Hacker News comments matching the search term",
    layout: ArgLayout::SearchFirst,
    endpoint: Endpoint::Recency,
    tag: ContentTag::Comment,
    properties: PropertyMap::new(COMMENT_LIST_PROPERTIES),
    empty_value: EmptyValue::EmptyString,
    examples: &[r#"["microsoft"]"#, r#"["google", "author,comment"]"#],
};

const STORY_LIST_PROPERTIES: &[Property] = &[
    Property::new("title", "title", "The title of the story"),
    Property::new("url", "url", "The url of the story"),
    Property::new("author", "author", "The user who submitted the story"),
    Property::new("points", "points", "The number of points the story has"),
    Property::new("story_text", "story_text", "The story text"),
    Property::new("comment_text", "comment_text", "The comment text"),
    Property::new("num_comments", "num_comments", "The number of comments"),
    Property::new("story_id", "story_id", "The story id"),
    Property::new("story_title", "story_title", "The story title"),
    Property::new("story_url", "story_url", "The story url"),
    Property::new("parent_id", "parent_id", "The parent id"),
    Property::new("created_at", "created_at", "The date the story was created"),
];

pub const LIST_STORIES: HandlerDefinition = HandlerDefinition {
    name: "hackernews-list-stories",
    title: "Hacker News List Stories",
    description: "Returns the 100 most recent Hacker News stories matching the search term",
    layout: ArgLayout::SearchFirst,
    endpoint: Endpoint::Recency,
    tag: ContentTag::Story,
    properties: PropertyMap::new(STORY_LIST_PROPERTIES),
    empty_value: EmptyValue::EmptyString,
    examples: &[r#"["microsoft"]"#, r#"["google", "title,points"]"#],
};

const STORY_SEARCH_PROPERTIES: &[Property] = &[
    Property::new("title", "title", "The title of the story"),
    Property::new("url", "url", "The url of the story"),
    Property::new("author", "author", "The user who submitted the story"),
    Property::new("points", "points", "The number of points the story has"),
    Property::new("num_comments", "num_comments", "The number of comments"),
    Property::new("created_at", "created_at", "The date the story was created"),
];

pub const SEARCH_STORIES: HandlerDefinition = HandlerDefinition {
    name: "hackernews-search-stories",
    title: "Hacker News Search Stories",
    description: "Returns the 100 most relevant Hacker News stories matching the search term",
    layout: ArgLayout::PropertiesFirst { search: SEARCH },
    endpoint: Endpoint::Relevance,
    tag: ContentTag::Story,
    properties: PropertyMap::new(STORY_SEARCH_PROPERTIES),
    empty_value: EmptyValue::EmptyString,
    examples: &[r#"["*", "microsoft"]"#, r#"["title,url", "google", "headers=false"]"#],
};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Upstream access shared by every handler run.
pub struct HandlerContext<'a> {
    pub transport: &'a dyn Transport,
    /// API root the endpoint paths are appended to.
    pub api_root: &'a Url,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Data rows written, header excluded.
    pub rows: usize,
    pub pages_fetched: usize,
}

pub trait Handler: Send + Sync {
    fn definition(&self) -> &HandlerDefinition;

    /// Validate `args`, query upstream and write the JSON table to `out`.
    fn run(
        &self,
        ctx: &HandlerContext<'_>,
        args: &[Value],
        out: &mut dyn Write,
    ) -> HnResult<RunSummary>;
}

fn header_row(columns: &[String]) -> Row {
    columns.iter().cloned().map(Value::String).collect()
}

/// Single-page handler writing a fully buffered table.
pub struct BatchHandler {
    definition: HandlerDefinition,
}

impl BatchHandler {
    pub fn new(definition: HandlerDefinition) -> Self {
        Self { definition }
    }

    fn table(&self, ctx: &HandlerContext<'_>, request: &QueryRequest) -> HnResult<Vec<Row>> {
        let def = &self.definition;
        let columns = def.properties.resolve(&request.properties);
        let projector = def.properties.projector(&columns, def.empty_value);

        let hits = fetch_single(&ctx.transport, ctx.api_root, &def.query(request))
            .map_err(|e| {
                tracing::error!(handler = def.name, error = %e, "upstream request failed");
                HnError::HandlerFailed {
                    handler: def.name.to_string(),
                }
            })?;

        let mut table = Vec::with_capacity(hits.len() + 1);
        if request.config.headers {
            table.push(header_row(&columns));
        }
        table.extend(
            hits.iter()
                .take(request.config.limit)
                .map(|hit| projector.project(hit)),
        );
        Ok(table)
    }
}

impl Handler for BatchHandler {
    fn definition(&self) -> &HandlerDefinition {
        &self.definition
    }

    fn run(
        &self,
        ctx: &HandlerContext<'_>,
        args: &[Value],
        out: &mut dyn Write,
    ) -> HnResult<RunSummary> {
        let request = self.definition.parse_request(args)?;
        tracing::info!(handler = self.definition.name, search = %request.search_term, "running");

        let table = self.table(ctx, &request)?;
        let rows = table.len() - usize::from(request.config.headers);

        let body = serde_json::to_vec(&table).map_err(OutputError::from)?;
        out.write_all(&body).map_err(OutputError::from)?;
        out.flush().map_err(OutputError::from)?;

        tracing::info!(handler = self.definition.name, rows, "done");
        Ok(RunSummary {
            rows,
            pages_fetched: 1,
        })
    }
}

/// Paginating handler streaming rows as they arrive.
pub struct StreamingHandler {
    definition: HandlerDefinition,
}

impl StreamingHandler {
    pub fn new(definition: HandlerDefinition) -> Self {
        Self { definition }
    }
}

impl Handler for StreamingHandler {
    fn definition(&self) -> &HandlerDefinition {
        &self.definition
    }

    fn run(
        &self,
        ctx: &HandlerContext<'_>,
        args: &[Value],
        out: &mut dyn Write,
    ) -> HnResult<RunSummary> {
        let def = &self.definition;
        let request = def.parse_request(args)?;
        let columns = def.properties.resolve(&request.properties);
        let projector = def.properties.projector(&columns, def.empty_value);
        let query = def.query(&request);
        tracing::info!(
            handler = def.name,
            search = %request.search_term,
            limit = request.config.limit,
            "running"
        );

        let mut writer = JsonArrayWriter::begin(out)?;
        if request.config.headers {
            writer.push(&columns)?;
        }

        let mut cursor =
            PageCursor::new(&ctx.transport, ctx.api_root, &query, request.config.limit);
        for hit in cursor.by_ref() {
            writer.push(&projector.project(&hit?))?;
        }
        writer.finish()?;

        let summary = RunSummary {
            rows: cursor.emitted(),
            pages_fetched: cursor.pages_fetched(),
        };
        tracing::info!(
            handler = def.name,
            rows = summary.rows,
            pages = summary.pages_fetched,
            "done"
        );
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Handlers by name.
pub struct HandlerRegistry {
    handlers: BTreeMap<&'static str, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registry with every built-in handler.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StreamingHandler::new(SEARCH_COMMENTS)));
        registry.register(Box::new(BatchHandler::new(LIST_COMMENTS)));
        registry.register(Box::new(BatchHandler::new(LIST_STORIES)));
        registry.register(Box::new(BatchHandler::new(SEARCH_STORIES)));
        registry
    }

    /// Register a handler, replacing any with the same name.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.handlers.insert(handler.definition().name, handler);
    }

    pub fn get(&self, name: &str) -> HnResult<&dyn Handler> {
        self.handlers
            .get(name)
            .map(|h| h.as_ref())
            .ok_or_else(|| HnError::UnknownHandler {
                name: name.to_string(),
            })
    }

    /// Look up `name`, decode the raw JSON `input` and run the handler.
    pub fn run(
        &self,
        name: &str,
        ctx: &HandlerContext<'_>,
        input: &str,
        out: &mut dyn Write,
    ) -> HnResult<RunSummary> {
        let handler = self.get(name)?;
        let args = parse_input(input)?;
        handler.run(ctx, &args, out)
    }

    /// Definitions sorted by name.
    pub fn definitions(&self) -> impl Iterator<Item = &HandlerDefinition> {
        self.handlers.values().map(|h| h.definition())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
