use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::models::{Application, Details};

const UPCOMING_LIMIT: usize = 3;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub total: usize,
    pub applied: usize,
    pub interviewing: usize,
    pub offers: usize,
    pub upcoming: Vec<Upcoming>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upcoming {
    pub app_id: i64,
    pub title: String,
    pub organization: String,
    pub deadline: NaiveDate,
    pub days_until: i64,
}

impl Dashboard {
    pub fn compute(apps: &[Application], now: DateTime<Utc>) -> Self {
        let mut upcoming: Vec<Upcoming> = apps
            .iter()
            .filter_map(|app| {
                let deadline = app.deadline?;
                Some(Upcoming {
                    app_id: app.app_id,
                    title: app.title.clone(),
                    organization: app.organization().to_string(),
                    deadline,
                    days_until: days_until(deadline, now),
                })
            })
            .filter(|u| u.days_until >= 0)
            .collect();
        // stable, so ties keep insertion order
        upcoming.sort_by_key(|u| u.days_until);
        upcoming.truncate(UPCOMING_LIMIT);

        Self {
            total: apps.len(),
            applied: apps.iter().filter(|a| a.status.is_pending()).count(),
            interviewing: apps.iter().filter(|a| a.status.is_interviewing()).count(),
            offers: apps.iter().filter(|a| a.status.is_offer()).count(),
            upcoming,
        }
    }
}

/// Whole days from `now` until midnight UTC of `deadline`, rounded up.
fn days_until(deadline: NaiveDate, now: DateTime<Utc>) -> i64 {
    let due = deadline.and_time(NaiveTime::MIN).and_utc();
    let millis = (due - now).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).ceil() as i64
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStage {
    pub stage: &'static str,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceStat {
    pub name: String,
    pub total: usize,
    pub offers: usize,
    pub success_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub funnel: Vec<FunnelStage>,
    pub sources: Vec<SourceStat>,
}

impl Analytics {
    pub fn compute(apps: &[Application]) -> Self {
        let applied = apps.iter().filter(|a| a.status.reached_applied()).count();
        let interviewing = apps.iter().filter(|a| a.status.reached_interview()).count();
        let offers = apps.iter().filter(|a| a.status.is_offer()).count();

        let funnel = vec![
            FunnelStage {
                stage: "Applied",
                count: applied,
                percentage: 100,
            },
            FunnelStage {
                stage: "Interviewing",
                count: interviewing,
                percentage: percent(interviewing, applied),
            },
            FunnelStage {
                stage: "Offers",
                count: offers,
                percentage: percent(offers, applied),
            },
        ];

        // Sources in first-seen order
        let mut sources: Vec<SourceStat> = Vec::new();
        for app in apps {
            let Details::Job(job) = &app.details else { continue };
            if job.source.is_empty() {
                continue;
            }
            let idx = match sources.iter().position(|s| s.name == job.source) {
                Some(idx) => idx,
                None => {
                    sources.push(SourceStat {
                        name: job.source.clone(),
                        total: 0,
                        offers: 0,
                        success_rate: 0,
                    });
                    sources.len() - 1
                }
            };
            sources[idx].total += 1;
            if app.status.is_offer() {
                sources[idx].offers += 1;
            }
        }
        for source in &mut sources {
            source.success_rate = percent(source.offers, source.total);
        }

        Self { funnel, sources }
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use crate::seed::seed_collection;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn dashboard_counts_by_stage() {
        let dash = Dashboard::compute(&seed_collection(), at(2025, 10, 20, 12));
        assert_eq!(dash.total, 3);
        assert_eq!(dash.applied, 2);
        assert_eq!(dash.interviewing, 1);
        assert_eq!(dash.offers, 0);
    }

    #[test]
    fn upcoming_deadlines_sorted_and_future_only() {
        let dash = Dashboard::compute(&seed_collection(), at(2025, 10, 20, 12));
        let ids: Vec<i64> = dash.upcoming.iter().map(|u| u.app_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        // 2025-10-28T00:00Z is 7.5 days after 2025-10-20T12:00Z
        assert_eq!(dash.upcoming[0].days_until, 8);

        let later = Dashboard::compute(&seed_collection(), at(2025, 11, 20, 0));
        let ids: Vec<i64> = later.upcoming.iter().map(|u| u.app_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn deadline_stays_due_until_the_day_is_over() {
        let deadline = NaiveDate::from_ymd_opt(2025, 10, 28).unwrap();
        assert_eq!(days_until(deadline, at(2025, 10, 28, 0)), 0);
        assert_eq!(days_until(deadline, at(2025, 10, 28, 18)), 0);
        assert_eq!(days_until(deadline, at(2025, 10, 29, 1)), -1);
    }

    #[test]
    fn funnel_percentages_relative_to_applied() {
        let mut apps = seed_collection();
        apps[0].status = ApplicationStatus::OfferReceived;
        let analytics = Analytics::compute(&apps);
        let counts: Vec<(usize, u32)> =
            analytics.funnel.iter().map(|s| (s.count, s.percentage)).collect();
        assert_eq!(counts, vec![(3, 100), (2, 67), (1, 33)]);
    }

    #[test]
    fn funnel_is_zero_without_applications() {
        let analytics = Analytics::compute(&[]);
        assert_eq!(analytics.funnel[1].percentage, 0);
        assert!(analytics.sources.is_empty());
    }

    #[test]
    fn sources_cover_jobs_only() {
        let mut apps = seed_collection();
        apps[0].status = ApplicationStatus::OfferReceived;
        let analytics = Analytics::compute(&apps);
        assert_eq!(
            analytics.sources,
            vec![
                SourceStat {
                    name: "LinkedIn".to_string(),
                    total: 1,
                    offers: 1,
                    success_rate: 100,
                },
                SourceStat {
                    name: "Referral".to_string(),
                    total: 1,
                    offers: 0,
                    success_rate: 0,
                },
            ]
        );
    }
}
