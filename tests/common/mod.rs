use anyhow::Result;
use query_object::database::Schema;
use query_object::prelude::*;
use query_object::types::{Column, DataType, Table};

/// Articles in the fixture, ids `1..=ARTICLES`
#[allow(dead_code)]
pub const ARTICLES: i64 = 30;

/// Every sixth article is disabled, leaving 25 enabled ones
#[allow(dead_code)]
pub fn is_enabled(id: i64) -> bool {
    id % 6 != 0
}

/// Titles are a permutation of "Title 01".."Title 30", unrelated to the id order
#[allow(dead_code)]
pub fn article_title(id: i64) -> String {
    format!("Title {:02}", (id * 7) % 31)
}

/// Article `id` has `id % 3` comments
#[allow(dead_code)]
pub fn comment_count(id: i64) -> usize {
    (id % 3) as usize
}

#[allow(dead_code)]
pub fn enabled_titles_sorted() -> Vec<String> {
    let mut titles: Vec<String> = (1..=ARTICLES)
        .filter(|id| is_enabled(*id))
        .map(article_title)
        .collect();
    titles.sort();
    titles
}

#[allow(dead_code)]
pub fn blog_database() -> Result<Database> {
    let mut schema = Schema::new("blog".to_string());
    schema.add_table(
        Table::new(
            "articles".to_string(),
            vec![
                Column::new("id".to_string(), DataType::BigInt),
                Column::new("title".to_string(), DataType::Varchar(255)),
                Column::new("enabled".to_string(), DataType::Boolean),
            ],
        )
        .with_primary_key("id"),
    )?;
    schema.add_table(
        Table::new(
            "comments".to_string(),
            vec![
                Column::new("id".to_string(), DataType::BigInt),
                Column::new("article_id".to_string(), DataType::BigInt),
                Column::new("body".to_string(), DataType::Varchar(255)),
            ],
        )
        .with_primary_key("id"),
    )?;

    let mut db = Database::new(schema);
    let mut comment_id = 1000;
    for id in 1..=ARTICLES {
        db.insert(
            "articles",
            vec![
                Value::BigInt(id),
                article_title(id).into(),
                is_enabled(id).into(),
            ],
        )?;
        for n in 0..comment_count(id) {
            db.insert(
                "comments",
                vec![
                    Value::BigInt(comment_id),
                    Value::BigInt(id),
                    format!("comment {} on {}", n, id).into(),
                ],
            )?;
            comment_id += 1;
        }
    }
    Ok(db)
}

#[allow(dead_code)]
pub fn total_comments() -> usize {
    (1..=ARTICLES).map(comment_count).sum()
}

/// Article finder assembled from constraint objects
#[derive(Debug, Default)]
pub struct ArticleQuery {
    state: QueryObjectState,
    constraints: Constraints,
    title: Option<String>,
    count_query: Option<String>,
}

#[allow(dead_code)]
impl ArticleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            state: QueryObjectState::with_config(config),
            ..Self::default()
        }
    }

    pub fn state_mut(&mut self) -> &mut QueryObjectState {
        &mut self.state
    }

    pub fn only_enabled(&mut self) -> &mut Self {
        self.constraints.push(Constraint::filter(
            "a.enabled = :enabled",
            [("enabled", Value::Boolean(true))],
        ));
        self
    }

    pub fn by_id(&mut self, id: i64) -> &mut Self {
        let name = format!("id{}", self.constraints.len());
        let condition = format!("a.id = :{}", name);
        self.constraints
            .push(Constraint::filter(&condition, [(name, Value::BigInt(id))]));
        self
    }

    pub fn filter(&mut self, condition: &str) -> &mut Self {
        self.constraints
            .push(Constraint::filter(condition, Vec::<(String, Value)>::new()));
        self
    }

    /// Title equality bound as a parameter; changing it keeps the query text
    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn sort_by(&mut self, column: &str, direction: Direction) -> &mut Self {
        self.constraints.push(Constraint::order_by(column, direction));
        self
    }

    pub fn with_comments(&mut self) -> &mut Self {
        self.constraints.push(Constraint::fetch_join(
            JoinKind::Left,
            "comments",
            "c",
            "c.article_id = a.id",
        ));
        self
    }

    /// Count through a dedicated query instead of the paginating count
    pub fn count_with(&mut self, dql: &str) -> &mut Self {
        self.count_query = Some(dql.to_string());
        self
    }
}

impl<R: Repository + ?Sized> QueryObject<R> for ArticleQuery {
    fn state(&self) -> &QueryObjectState {
        &self.state
    }

    fn do_create_query(&self, repository: &R) -> Result<Query, QueryError> {
        let mut qb = repository.create_query_builder("a");
        self.constraints.apply(&mut qb);
        if let Some(title) = &self.title {
            qb.and_where("a.title = :title")
                .set_parameter("title", title.as_str());
        }
        Ok(qb.get_query())
    }

    fn do_create_count_query(&self, _repository: &R) -> Result<Query, QueryError> {
        match &self.count_query {
            Some(dql) => Ok(Query::structured(dql)),
            None => Err(InvalidState::CountQueryNotDefined.into()),
        }
    }
}

/// Finder issuing raw engine SQL
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct NativeArticleQuery {
    state: QueryObjectState,
}

impl<R: Repository + ?Sized> QueryObject<R> for NativeArticleQuery {
    fn state(&self) -> &QueryObjectState {
        &self.state
    }

    fn do_create_query(&self, _repository: &R) -> Result<Query, QueryError> {
        Ok(Query::native(
            "SELECT * FROM articles WHERE enabled = TRUE ORDER BY id",
        ))
    }
}

#[allow(dead_code)]
pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .collect()
}

#[allow(dead_code)]
pub fn titles(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| match r.get("title") {
            Some(Value::String(title)) => Some(title.clone()),
            _ => None,
        })
        .collect()
}
