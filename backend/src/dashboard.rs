//! Admin dashboard: directory and trip statistics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use travel_common::{TripRecord, UserRecord, UserStatus};

use crate::directory::{Directory, DirectoryError, SqliteStore};

/// How many trips and users the "latest" panels show.
const LATEST_COUNT: u32 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub current_month: u64,
    pub last_month: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCount {
    pub total: u64,
    pub current_month: u64,
    pub last_month: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleCount {
    pub travel_style: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub users_joined: MonthlyCount,
    pub total_trips: u64,
    pub trips_created: MonthlyCount,
    pub user_role: RoleCount,
    pub user_growth: Vec<DayCount>,
    pub trips_by_travel_style: Vec<StyleCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestTrip {
    pub id: String,
    pub name: String,
    pub country: String,
    pub travel_style: String,
    pub estimated_price: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTripCount {
    pub account_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub latest_trips: Vec<LatestTrip>,
    pub latest_users: Vec<UserTripCount>,
}

/// Half-open `[start, end)` bounds of the current and previous calendar month.
struct MonthWindows {
    last_start: DateTime<Utc>,
    current_start: DateTime<Utc>,
    next_start: DateTime<Utc>,
}

impl MonthWindows {
    fn around(now: DateTime<Utc>) -> Self {
        let (year, month) = (now.year(), now.month());
        let previous = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
        let next = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        Self {
            last_start: month_start(previous.0, previous.1),
            current_start: month_start(year, month),
            next_start: month_start(next.0, next.1),
        }
    }

    fn count<I>(&self, timestamps: I) -> MonthlyCount
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut counts = MonthlyCount::default();
        for ts in timestamps {
            if ts >= self.current_start && ts < self.next_start {
                counts.current_month += 1;
            } else if ts >= self.last_start && ts < self.current_start {
                counts.last_month += 1;
            }
        }
        counts
    }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Aggregate statistics over the full user and trip sets.
pub fn compute_stats(users: &[UserRecord], trips: &[TripRecord], now: DateTime<Utc>) -> DashboardStats {
    let windows = MonthWindows::around(now);

    let users_joined = windows.count(users.iter().map(|u| u.joined_at));
    let trips_created = windows.count(trips.iter().map(|t| t.created_at));

    let plain_users: Vec<_> = users
        .iter()
        .filter(|u| u.status == UserStatus::User)
        .map(|u| u.joined_at)
        .collect();
    let plain = windows.count(plain_users.iter().copied());
    let user_role = RoleCount {
        total: plain_users.len() as u64,
        current_month: plain.current_month,
        last_month: plain.last_month,
    };

    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for user in users {
        *per_day.entry(user.joined_at.date_naive()).or_default() += 1;
    }
    let user_growth = per_day
        .into_iter()
        .map(|(day, count)| DayCount { day, count })
        .collect();

    DashboardStats {
        total_users: users.len() as u64,
        users_joined,
        total_trips: trips.len() as u64,
        trips_created,
        user_role,
        user_growth,
        trips_by_travel_style: trips_by_travel_style(trips),
    }
}

/// Trip counts per travel style, most popular first.
///
/// Trips whose stored itinerary no longer parses are left out.
fn trips_by_travel_style(trips: &[TripRecord]) -> Vec<StyleCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for trip in trips {
        match trip.trip() {
            Some(detail) => *counts.entry(detail.travel_style).or_default() += 1,
            None => tracing::debug!("Skipping trip {} with unreadable detail", trip.id),
        }
    }

    let mut styles: Vec<StyleCount> = counts
        .into_iter()
        .map(|(travel_style, count)| StyleCount { travel_style, count })
        .collect();
    styles.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.travel_style.cmp(&b.travel_style)));
    styles
}

fn latest_trip(record: TripRecord) -> LatestTrip {
    let detail = record.trip();
    LatestTrip {
        name: detail.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
        country: detail.as_ref().map(|t| t.country.clone()).unwrap_or_default(),
        travel_style: detail.as_ref().map(|t| t.travel_style.clone()).unwrap_or_default(),
        estimated_price: detail.map(|t| t.estimated_price).unwrap_or_default(),
        id: record.id,
        image_urls: record.image_urls,
    }
}

async fn blocking<T, F>(store: &Arc<SqliteStore>, read: F) -> Result<T, DirectoryError>
where
    T: Send + 'static,
    F: FnOnce(&SqliteStore) -> Result<T, DirectoryError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || read(&store))
        .await
        .map_err(|e| DirectoryError::Io(e.to_string()))?
}

/// Run every dashboard read concurrently, then aggregate.
///
/// Any failed read fails the whole dashboard.
pub async fn load_dashboard(
    directory: &dyn Directory,
    store: &Arc<SqliteStore>,
    now: DateTime<Utc>,
) -> Result<Dashboard, DirectoryError> {
    let (users, trips, latest_trips, latest_users, trip_counts) = tokio::join!(
        directory.all_users(),
        blocking(store, |s| s.all_trips()),
        blocking(store, |s| s.list_trips(LATEST_COUNT, 0)),
        directory.list_users(LATEST_COUNT, 0),
        blocking(store, |s| s.trip_counts()),
    );
    let (users, trips, latest_trips, latest_users, trip_counts) =
        (users?, trips?, latest_trips?, latest_users?, trip_counts?);

    let stats = compute_stats(&users, &trips, now);

    let latest_users = latest_users
        .users
        .into_iter()
        .map(|user| UserTripCount {
            count: trip_counts.get(&user.account_id).copied().unwrap_or(0),
            account_id: user.account_id,
            name: user.name,
            image_url: user.image_url,
        })
        .collect();

    Ok(Dashboard {
        stats,
        latest_trips: latest_trips.trips.into_iter().map(latest_trip).collect(),
        latest_users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use travel_common::NewUser;

    use crate::test_util::sample_trip;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn user(id: &str, joined_at: DateTime<Utc>, status: UserStatus) -> UserRecord {
        let mut record = UserRecord::new(
            NewUser {
                account_id: id.to_string(),
                email: format!("{}@example.com", id),
                name: id.to_string(),
                image_url: None,
            },
            joined_at,
        );
        record.status = status;
        record
    }

    fn trip(id: &str, style: &str, created_at: DateTime<Utc>) -> TripRecord {
        let mut detail = sample_trip();
        detail.travel_style = style.to_string();
        TripRecord {
            id: id.to_string(),
            trip_detail: serde_json::to_string(&detail).unwrap(),
            created_at,
            image_urls: vec![],
            user_id: "acc-1".to_string(),
        }
    }

    #[test]
    fn test_monthly_windows() {
        let now = at(2025, 3, 15);
        let users = vec![
            user("a", at(2025, 3, 1), UserStatus::User),
            user("b", at(2025, 3, 14), UserStatus::Admin),
            user("c", at(2025, 2, 28), UserStatus::User),
            user("d", at(2025, 1, 10), UserStatus::User),
        ];
        let stats = compute_stats(&users, &[], now);

        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.users_joined, MonthlyCount { current_month: 2, last_month: 1 });
        assert_eq!(stats.user_role, RoleCount { total: 3, current_month: 1, last_month: 1 });
    }

    #[test]
    fn test_january_looks_back_to_december() {
        let now = at(2025, 1, 5);
        let users = vec![
            user("a", at(2024, 12, 31), UserStatus::User),
            user("b", at(2024, 11, 30), UserStatus::User),
        ];
        let stats = compute_stats(&users, &[], now);
        assert_eq!(stats.users_joined, MonthlyCount { current_month: 0, last_month: 1 });
    }

    #[test]
    fn test_user_growth_is_ascending_per_day() {
        let users = vec![
            user("a", at(2025, 3, 2), UserStatus::User),
            user("b", at(2025, 3, 1), UserStatus::User),
            user("c", at(2025, 3, 2), UserStatus::User),
        ];
        let stats = compute_stats(&users, &[], at(2025, 3, 15));

        let days: Vec<_> = stats.user_growth.iter().map(|d| (d.day.day(), d.count)).collect();
        assert_eq!(days, vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_trips_by_travel_style_descending() {
        let now = at(2025, 3, 15);
        let mut unreadable = trip("t5", "Luxury", now);
        unreadable.trip_detail = "not json".to_string();
        let trips = vec![
            trip("t1", "Relaxed", now),
            trip("t2", "Adventure", now),
            trip("t3", "Adventure", at(2025, 2, 3)),
            trip("t4", "Cultural", now),
            unreadable,
        ];
        let stats = compute_stats(&[], &trips, now);

        assert_eq!(stats.total_trips, 5);
        assert_eq!(stats.trips_created, MonthlyCount { current_month: 4, last_month: 1 });
        let styles: Vec<_> = stats
            .trips_by_travel_style
            .iter()
            .map(|s| (s.travel_style.as_str(), s.count))
            .collect();
        assert_eq!(styles, vec![("Adventure", 2), ("Cultural", 1), ("Relaxed", 1)]);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = compute_stats(&[user("a", at(2025, 3, 1), UserStatus::User)], &[], at(2025, 3, 2));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["usersJoined"]["currentMonth"], 1);
        assert_eq!(json["userGrowth"][0]["day"], "2025-03-01");
        assert!(json["tripsByTravelStyle"].is_array());
    }

    #[tokio::test]
    async fn test_load_dashboard_joins_all_reads() {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        for id in ["acc-1", "acc-2"] {
            store
                .insert_user_if_absent(
                    &NewUser {
                        account_id: id.to_string(),
                        email: format!("{}@example.com", id),
                        name: id.to_string(),
                        image_url: None,
                    },
                    Utc::now(),
                )
                .unwrap();
        }
        store.insert_trip("acc-1", &sample_trip(), &["https://u/1".to_string()]).unwrap();
        store.insert_trip("acc-1", &sample_trip(), &[]).unwrap();

        let dashboard = load_dashboard(&*store, &store, Utc::now()).await.unwrap();

        assert_eq!(dashboard.stats.total_users, 2);
        assert_eq!(dashboard.stats.total_trips, 2);
        assert_eq!(dashboard.latest_trips.len(), 2);
        assert_eq!(dashboard.latest_trips[0].name, "Kyoto Calm");

        let counts: HashMap<_, _> = dashboard
            .latest_users
            .iter()
            .map(|u| (u.account_id.as_str(), u.count))
            .collect();
        assert_eq!(counts["acc-1"], 2);
        assert_eq!(counts["acc-2"], 0);
    }
}
