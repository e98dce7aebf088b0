use crate::error::{QueryError, QueryResult};

/// How many rows a query is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    Many,
    /// At least one row; only the first is read.
    First,
    FirstOrDefault,
    /// Exactly one row.
    Single,
    /// At most one row.
    SingleOrDefault,
}

impl Cardinality {
    /// Drain `rows` under this contract.
    ///
    /// Reading stops as soon as the outcome is known: after the first row
    /// for `First*`, after the second for `Single*`. The iterator is dropped
    /// on return, so a reader behind it is released either way.
    pub fn apply<T>(self, rows: impl IntoIterator<Item = QueryResult<T>>) -> QueryResult<Vec<T>> {
        let mut rows = rows.into_iter();
        match self {
            Cardinality::Many => rows.collect(),
            Cardinality::First | Cardinality::FirstOrDefault => match rows.next().transpose()? {
                Some(row) => Ok(vec![row]),
                None if self == Cardinality::First => Err(QueryError::NoRows),
                None => Ok(Vec::new()),
            },
            Cardinality::Single | Cardinality::SingleOrDefault => {
                let first = match rows.next().transpose()? {
                    Some(row) => row,
                    None if self == Cardinality::Single => return Err(QueryError::NoRows),
                    None => return Ok(Vec::new()),
                };
                if rows.next().transpose()?.is_some() {
                    return Err(QueryError::MultipleResults);
                }
                Ok(vec![first])
            }
        }
    }
}

/// `DefaultIfEmpty`: a one-element result built by `default` when there
/// are no rows. `default` only runs on an empty result.
pub fn default_if_empty<T>(items: Vec<T>, default: impl FnOnce() -> T) -> Vec<T> {
    if items.is_empty() {
        vec![default()]
    } else {
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> impl Iterator<Item = QueryResult<usize>> {
        (0..n).map(Ok)
    }

    #[test]
    fn test_single_contract() {
        assert!(matches!(Cardinality::Single.apply(rows(0)), Err(QueryError::NoRows)));
        assert_eq!(Cardinality::Single.apply(rows(1)).unwrap(), vec![0]);
        assert!(matches!(
            Cardinality::Single.apply(rows(2)),
            Err(QueryError::MultipleResults)
        ));
        assert!(Cardinality::SingleOrDefault.apply(rows(0)).unwrap().is_empty());
        assert!(matches!(
            Cardinality::SingleOrDefault.apply(rows(3)),
            Err(QueryError::MultipleResults)
        ));
    }

    #[test]
    fn test_first_reads_one_row() {
        let mut read = 0;
        let counted = (0..10).map(|i| {
            read += 1;
            Ok(i)
        });
        assert_eq!(Cardinality::First.apply(counted).unwrap(), vec![0]);
        assert_eq!(read, 1);
        assert!(matches!(Cardinality::First.apply(rows(0)), Err(QueryError::NoRows)));
        assert!(Cardinality::FirstOrDefault.apply(rows(0)).unwrap().is_empty());
    }

    #[test]
    fn test_errors_pass_through() {
        let failing = vec![Err(QueryError::Projection("bad row".into()))];
        assert!(matches!(
            Cardinality::Many.apply::<usize>(failing),
            Err(QueryError::Projection(_))
        ));
    }

    #[test]
    fn test_default_if_empty_is_lazy() {
        assert_eq!(default_if_empty(vec![1, 2], || panic!("evaluated")), vec![1, 2]);
        assert_eq!(default_if_empty(Vec::new(), || 7), vec![7]);
    }
}
