use obs_ranker::Ranker;
use obs_types::{Date, Facet, Point, SourceSeries};

/// Picks a single best point or series from an already rank-ordered,
/// merged set of `SourceSeries` (spec §4.5).
pub struct BestPicker<'a> {
    ranker: &'a Ranker,
}

impl<'a> BestPicker<'a> {
    pub fn new(ranker: &'a Ranker) -> Self {
        Self { ranker }
    }

    /// `series` must already be rank-ordered (lowest score/best first),
    /// per `Ranker::sort_series`.
    ///
    /// If `date` is given: walk in rank order, return the first exact
    /// value at that date.
    ///
    /// If `date` is empty: walk in rank order tracking the latest date
    /// seen so far across all series; a later latest date wins over a
    /// better rank, **except** that once a preferred (non-inferior)
    /// series has contributed the current-best candidate, an inferior
    /// series may never override it, even with a later date (spec §8
    /// invariant 5, the "inferior guard").
    pub fn best_point_at(&self, series: &[SourceSeries], date: Option<&Date>) -> Option<(Point, Facet)> {
        if let Some(date) = date {
            return series.iter().find_map(|s| {
                s.value_at(date).map(|value| (Point { date: date.clone(), value }, s.facet.clone()))
            });
        }

        let mut best: Option<(Point, Facet, bool)> = None;
        for s in series {
            let Some(latest) = s.latest_date() else { continue };
            let is_inferior = self.ranker.table().is_inferior(&s.facet);

            let candidate_wins = match &best {
                None => true,
                Some((best_point, _, best_is_preferred)) => {
                    if *best_is_preferred && is_inferior {
                        false
                    } else {
                        latest > &best_point.date
                    }
                }
            };

            if candidate_wins {
                let value = s.value_at(latest).expect("latest_date always has a value");
                best = Some((Point { date: latest.clone(), value }, s.facet.clone(), !is_inferior));
            }
        }

        best.map(|(point, facet, _)| (point, facet))
    }

    /// `importName` nonempty: first series matching that import name, or
    /// `None`. Otherwise: the series with the latest date if `use_latest`,
    /// else the rank-winner (`series[0]`).
    pub fn best_series<'s>(
        &self,
        series: &'s [SourceSeries],
        import_name: Option<&str>,
        use_latest: bool,
    ) -> Option<&'s SourceSeries> {
        if let Some(import_name) = import_name {
            if !import_name.is_empty() {
                return series.iter().find(|s| s.facet.import_name == import_name);
            }
        }

        if use_latest {
            series.iter().max_by(|a, b| a.latest_date().cmp(&b.latest_date()))
        } else {
            series.first()
        }
    }
}
