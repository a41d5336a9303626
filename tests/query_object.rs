mod common;

use anyhow::Result;
use common::{blog_database, ids, total_comments, ArticleQuery, NativeArticleQuery};
use query_object::error::EngineError;
use query_object::prelude::*;
use query_object::query::{PaginatedQuery, PaginationOptions};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_fetch_twice_returns_same_result_set() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled();

    let first = query.fetch(&repository)?;
    let second = query.fetch(&repository)?;
    assert!(ResultSet::ptr_eq(&first, &second));

    first.get_total_count()?;
    assert!(second.is_frozen());
    Ok(())
}

#[test]
fn test_unchanged_constraints_reuse_across_handles() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled();

    query.fetch(&repository)?.get_total_count()?;
    let executions = db.execution_count();

    let again = query.fetch(&repository)?;
    assert!(again.is_frozen());
    assert_eq!(again.get_total_count()?, 25);
    assert_eq!(db.execution_count(), executions);
    Ok(())
}

#[test]
fn test_changed_constraints_build_new_result_set() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled();

    let before = {
        let articles = query.fetch(&repository)?;
        articles.get_total_count()?;
        articles.query()
    };

    query.by_id(3);
    let articles = query.fetch(&repository)?;
    assert!(!articles.is_frozen());
    assert_ne!(articles.query().dql(), before.dql());
    assert_eq!(articles.get_total_count()?, 1);
    Ok(())
}

#[test]
fn test_changed_parameters_build_new_result_set() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.set_title(&common::article_title(1));

    let before = {
        let articles = query.fetch(&repository)?;
        assert_eq!(articles.get_total_count()?, 1);
        articles.query()
    };

    query.set_title("No such title");
    let articles = query.fetch(&repository)?;
    assert_eq!(articles.query().dql(), before.dql());
    assert!(!articles.is_frozen());
    assert_eq!(articles.get_total_count()?, 0);
    Ok(())
}

#[test]
fn test_fetch_resets_paging_until_materialized() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let query = ArticleQuery::new();

    query.fetch(&repository)?.apply_paging(Some(5), Some(5))?;
    let articles = query.fetch(&repository)?;
    assert_eq!(articles.query().first_result(), None);
    assert_eq!(articles.query().max_results(), None);

    articles.apply_paging(Some(5), Some(5))?;
    assert_eq!(articles.count()?, 5);

    let again = query.fetch(&repository)?;
    assert_eq!(again.query().first_result(), Some(5));
    assert_eq!(again.count()?, 5);
    Ok(())
}

#[test]
fn test_fetch_one() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;

    let mut query = ArticleQuery::new();
    query.by_id(7);
    let article = query.fetch_one(&repository)?.expect("article 7 exists");
    assert_eq!(article.get("id"), Some(&Value::BigInt(7)));

    let mut missing = ArticleQuery::new();
    missing.by_id(999);
    assert!(missing.fetch_one(&repository)?.is_none());
    Ok(())
}

#[test]
fn test_fetch_one_leaves_result_set_unfrozen() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled();

    query.fetch_one(&repository)?;
    let articles = query.fetch(&repository)?;
    assert!(!articles.is_frozen());
    assert_eq!(articles.count()?, 25);
    Ok(())
}

#[test]
fn test_fetch_hydrated_array_is_unpaged() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled().sort_by("a.id", Direction::Asc);

    query.fetch(&repository)?.apply_paging(Some(0), Some(3))?;

    let rows = query
        .fetch_hydrated(&repository, HydrationMode::Array)?
        .into_records()?;
    assert_eq!(rows.len(), 25);
    assert_eq!(rows[0].get("a.id"), Some(&Value::BigInt(1)));
    assert!(rows[0].as_entity().is_none());

    let articles = query.fetch(&repository)?;
    assert!(!articles.is_frozen());
    Ok(())
}

#[test]
fn test_fetch_hydrated_object_returns_result_set() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let query = ArticleQuery::new();

    let fetched = query.fetch_hydrated(&repository, HydrationMode::Object)?;
    let articles = fetched.into_result_set().expect("object hydration is lazy");
    assert!(ResultSet::ptr_eq(&articles, &query.fetch(&repository)?));
    Ok(())
}

#[test]
fn test_count_defaults_to_paginated_count() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled().with_comments();

    let counted = query.count(&repository, None, None)?;

    let default_query = query.fetch(&repository)?.query().without_paging();
    let expected = PaginatedQuery::new(&default_query, true)?.count(&db)?;
    assert_eq!(counted, expected);
    assert_eq!(counted, 25);
    Ok(())
}

#[test]
fn test_count_query_takes_precedence() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.only_enabled().count_with("SELECT COUNT(*) FROM comments c");

    let articles = query.fetch(&repository)?;
    assert_eq!(articles.get_total_count()? as usize, total_comments());
    Ok(())
}

#[test]
fn test_count_uses_supplied_paginated_query() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let query = ArticleQuery::new();

    let comments = PaginatedQuery::new(&Query::structured("SELECT c FROM comments c"), true)?;
    let counted = query.count(&repository, None, Some(&comments))?;
    assert_eq!(counted as usize, total_comments());
    Ok(())
}

#[test]
fn test_count_follows_config_defaults() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let config = QueryConfig {
        fetch_join_collection: false,
        ..QueryConfig::default()
    };
    let mut query = ArticleQuery::with_config(config);
    query.with_comments();

    // one joined row per comment, plus one for each article without comments
    let rows = query.count(&repository, None, None)?;
    let childless = (1..=common::ARTICLES)
        .filter(|id| common::comment_count(*id) == 0)
        .count();
    assert_eq!(rows as usize, total_comments() + childless);

    let articles = query.fetch(&repository)?;
    assert!(!articles.fetch_join_collection());
    Ok(())
}

#[test]
fn test_engine_errors_carry_the_query() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.filter("a.missing = 1");

    let articles = query.fetch(&repository)?;
    let err = articles.get_iterator(HydrationMode::Object).unwrap_err();
    match &err {
        QueryError::Execution { source, query } => {
            assert!(matches!(source, EngineError::UnknownColumn(_)));
            assert!(query.as_ref().unwrap().dql().contains("a.missing"));
        }
        other => panic!("expected an execution error, got {:?}", other),
    }
    assert!(err.to_string().starts_with("[SELECT a FROM articles a"));
    assert!(!articles.is_frozen());
    Ok(())
}

#[test]
fn test_broken_count_query_is_not_swallowed() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let mut query = ArticleQuery::new();
    query.count_with("SELECT COUNT(*) FROM missing m");

    let err = query.count(&repository, None, None).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Execution {
            source: EngineError::UnknownTable(_),
            ..
        }
    ));
    Ok(())
}

#[test]
fn test_native_query_fetches_but_cannot_paginate() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let query = NativeArticleQuery::default();

    let first = query.fetch(&repository)?;
    let second = query.fetch(&repository)?;
    assert!(!ResultSet::ptr_eq(&first, &second));

    second.apply_sorting(["title DESC"])?;
    second.apply_paging(Some(10), Some(5))?;
    assert_eq!(second.query().dql(), first.query().dql());

    assert!(matches!(
        second.get_total_count(),
        Err(QueryError::InvalidArgument(_))
    ));
    assert_eq!(ids(&second.to_array(HydrationMode::Object)?).len(), 25);
    Ok(())
}

#[test]
fn test_last_query_reflects_sorting() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let query = ArticleQuery::new();
    assert!(QueryObject::<EntityRepository>::last_query(&query).is_none());

    query.fetch(&repository)?.apply_sorting(["a.title"])?;
    let last = QueryObject::<EntityRepository>::last_query(&query).expect("query was built");
    assert!(last.dql().ends_with("ORDER BY a.title ASC"));
    Ok(())
}

#[test]
fn test_post_fetch_listeners_run_once_per_materialization() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let seen = Rc::new(Cell::new(0usize));
    let calls = Rc::new(Cell::new(0usize));

    let mut query = ArticleQuery::new();
    query.only_enabled();
    {
        let seen = Rc::clone(&seen);
        let calls = Rc::clone(&calls);
        query.state_mut().on_post_fetch(move |rows| {
            seen.set(seen.get() + rows.len());
            calls.set(calls.get() + 1);
        });
    }

    let articles = query.fetch(&repository)?;
    articles.get_iterator(HydrationMode::Object)?;
    articles.to_array(HydrationMode::Object)?;
    articles.count()?;
    assert_eq!((calls.get(), seen.get()), (1, 25));

    query.fetch_one(&repository)?;
    assert_eq!((calls.get(), seen.get()), (2, 26));
    Ok(())
}

#[test]
fn test_fetch_one_without_match_skips_listeners() -> Result<()> {
    let db = blog_database()?;
    let repository = EntityRepository::new(&db, "articles")?;
    let calls = Rc::new(Cell::new(0usize));

    let mut query = ArticleQuery::new();
    query.by_id(999);
    {
        let calls = Rc::clone(&calls);
        query
            .state_mut()
            .on_post_fetch(move |_| calls.set(calls.get() + 1));
    }

    assert!(query.fetch_one(&repository)?.is_none());
    assert_eq!(calls.get(), 0);
    Ok(())
}

/// Engine that always answers with two rows
struct DuplicatingEngine;

impl QueryEngine for DuplicatingEngine {
    fn execute(&self, _query: &Query) -> Result<Vec<Record>, EngineError> {
        Ok(vec![
            Record::Scalar(vec![Value::BigInt(1)]),
            Record::Scalar(vec![Value::BigInt(2)]),
        ])
    }

    fn execute_scalar(&self, _query: &Query) -> Result<Value, EngineError> {
        Err(EngineError::NonUniqueResult)
    }

    fn paginated_count(&self, _query: &Query, _options: &PaginationOptions) -> Result<u64, EngineError> {
        Ok(2)
    }

    fn paginated_iterate(
        &self,
        query: &Query,
        _options: &PaginationOptions,
    ) -> Result<Vec<Record>, EngineError> {
        self.execute(query)
    }
}

struct DuplicatingRepository(DuplicatingEngine);

impl Repository for DuplicatingRepository {
    fn create_query_builder(&self, alias: &str) -> QueryBuilder {
        QueryBuilder::new("anything", alias)
    }

    fn engine(&self) -> &dyn QueryEngine {
        &self.0
    }
}

#[test]
fn test_fetch_one_rejects_several_rows() {
    let repository = DuplicatingRepository(DuplicatingEngine);
    let query = ArticleQuery::new();

    assert!(matches!(
        query.fetch_one(&repository),
        Err(QueryError::InvalidState(InvalidState::NonUniqueResult))
    ));
}
