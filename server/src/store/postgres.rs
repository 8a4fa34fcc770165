use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Lot, NewReservation, Reservation, ReservationDetails, Spot, SpotStatus};
use crate::services::clock::CivilZone;
use crate::services::error::{ParkingError, ParkingResult};
use crate::services::{ledger, lots, registry};
use crate::store::{ParkingStore, SpotCounts};

const LOT_COLUMNS: &str = "id, name, address, postal_code, hourly_rate, capacity, created_at";
const SPOT_COLUMNS: &str = "id, lot_id, label, position, status, created_at";
const RESERVATION_COLUMNS: &str =
    "id, spot_id, user_id, start_time, end_time, hourly_rate, total_cost, vehicle_number, created_at";

const LOT_NAME_KEY: &str = "parking_lots_name_key";
const ONE_OPEN_PER_SPOT: &str = "reservations_one_open_per_spot";
const ONE_OPEN_PER_USER: &str = "reservations_one_open_per_user";

fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}

fn lot_write_error(err: sqlx::Error, name: &str) -> ParkingError {
    if violated_constraint(&err) == Some(LOT_NAME_KEY) {
        ParkingError::DuplicateLotName(name.to_string())
    } else {
        ParkingError::Storage(err)
    }
}

/// Postgres-backed store. Each mutating method is one transaction that locks
/// the rows it checks with `FOR UPDATE`; the partial unique indexes on open
/// reservations catch what row locks cannot (two spots, one user).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> ParkingResult<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}

async fn lock_lot(tx: &mut Transaction<'_, Postgres>, lot_id: Uuid) -> ParkingResult<Lot> {
    sqlx::query_as::<_, Lot>(&format!(
        "SELECT {LOT_COLUMNS} FROM parking_lots WHERE id = $1 FOR UPDATE"
    ))
    .bind(lot_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(ParkingError::LotNotFound(lot_id))
}

async fn lock_spots_of(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
) -> ParkingResult<Vec<Spot>> {
    Ok(sqlx::query_as::<_, Spot>(&format!(
        "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE lot_id = $1 ORDER BY position FOR UPDATE"
    ))
    .bind(lot_id)
    .fetch_all(&mut **tx)
    .await?)
}

async fn lock_spot(tx: &mut Transaction<'_, Postgres>, spot_id: Uuid) -> ParkingResult<Spot> {
    sqlx::query_as::<_, Spot>(&format!(
        "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE id = $1 FOR UPDATE"
    ))
    .bind(spot_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(ParkingError::SpotNotFound(spot_id))
}

async fn write_spot_status(
    tx: &mut Transaction<'_, Postgres>,
    spot: &Spot,
) -> ParkingResult<()> {
    sqlx::query("UPDATE parking_spots SET status = $2 WHERE id = $1")
        .bind(spot.id)
        .bind(spot.status)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_spots(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    spots: &[Spot],
) -> ParkingResult<()> {
    if spots.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = spots.iter().map(|s| s.id).collect();
    let labels: Vec<String> = spots.iter().map(|s| s.label.clone()).collect();
    let positions: Vec<i32> = spots.iter().map(|s| s.position).collect();
    sqlx::query(
        r#"
        INSERT INTO parking_spots (id, lot_id, label, position)
        SELECT s.id, $1, s.label, s.position
        FROM UNNEST($2::uuid[], $3::text[], $4::int4[]) AS s(id, label, position)
        "#,
    )
    .bind(lot_id)
    .bind(&ids)
    .bind(&labels)
    .bind(&positions)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ParkingStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_lot(&self, lot: Lot, spots: Vec<Spot>) -> ParkingResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO parking_lots (id, name, address, postal_code, hourly_rate, capacity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(lot.id)
        .bind(&lot.name)
        .bind(&lot.address)
        .bind(&lot.postal_code)
        .bind(lot.hourly_rate)
        .bind(lot.capacity)
        .bind(lot.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| lot_write_error(e, &lot.name))?;

        insert_spots(&mut tx, lot.id, &spots).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_lot(&self, lot: Lot, now: DateTime<Utc>) -> ParkingResult<()> {
        let mut tx = self.begin().await?;
        lock_lot(&mut tx, lot.id).await?;
        let spots = lock_spots_of(&mut tx, lot.id).await?;
        let plan = lots::plan_resize(lot.id, &spots, lot.capacity)?;

        sqlx::query(
            r#"
            UPDATE parking_lots
            SET name = $2, address = $3, postal_code = $4, hourly_rate = $5, capacity = $6
            WHERE id = $1
            "#,
        )
        .bind(lot.id)
        .bind(&lot.name)
        .bind(&lot.address)
        .bind(&lot.postal_code)
        .bind(lot.hourly_rate)
        .bind(lot.capacity)
        .execute(&mut *tx)
        .await
        .map_err(|e| lot_write_error(e, &lot.name))?;

        if !plan.remove.is_empty() {
            sqlx::query("DELETE FROM parking_spots WHERE id = ANY($1)")
                .bind(&plan.remove)
                .execute(&mut *tx)
                .await?;
        }
        let added: Vec<Spot> = plan
            .add
            .iter()
            .map(|&position| Spot::new(lot.id, position, now))
            .collect();
        insert_spots(&mut tx, lot.id, &added).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_lot(&self, lot_id: Uuid) -> ParkingResult<()> {
        let mut tx = self.begin().await?;
        lock_lot(&mut tx, lot_id).await?;
        let spots = lock_spots_of(&mut tx, lot_id).await?;
        lots::ensure_deletable(lot_id, &spots)?;

        sqlx::query("DELETE FROM parking_lots WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_lot(&self, lot_id: Uuid) -> ParkingResult<Option<Lot>> {
        Ok(sqlx::query_as::<_, Lot>(&format!(
            "SELECT {LOT_COLUMNS} FROM parking_lots WHERE id = $1"
        ))
        .bind(lot_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_lots(&self) -> ParkingResult<Vec<Lot>> {
        Ok(sqlx::query_as::<_, Lot>(&format!(
            "SELECT {LOT_COLUMNS} FROM parking_lots ORDER BY created_at, name"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_lots(&self) -> ParkingResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM parking_lots")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn spot_counts(&self, lot_id: Uuid) -> ParkingResult<SpotCounts> {
        let (total, occupied): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'occupied')
            FROM parking_spots
            WHERE lot_id = $1
            "#,
        )
        .bind(lot_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(SpotCounts { total, occupied })
    }

    async fn get_spot(&self, spot_id: Uuid) -> ParkingResult<Option<Spot>> {
        Ok(sqlx::query_as::<_, Spot>(&format!(
            "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE id = $1"
        ))
        .bind(spot_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_spots(&self, lot_id: Uuid) -> ParkingResult<Vec<Spot>> {
        Ok(sqlx::query_as::<_, Spot>(&format!(
            "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE lot_id = $1 ORDER BY position"
        ))
        .bind(lot_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn first_available_spot(&self, lot_id: Uuid) -> ParkingResult<Option<Spot>> {
        Ok(sqlx::query_as::<_, Spot>(&format!(
            "SELECT {SPOT_COLUMNS} FROM parking_spots \
             WHERE lot_id = $1 AND status = 'available' ORDER BY position LIMIT 1"
        ))
        .bind(lot_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_spot_status(&self, spot_id: Uuid, target: SpotStatus) -> ParkingResult<Spot> {
        let mut tx = self.begin().await?;
        let spot = lock_spot(&mut tx, spot_id).await?;
        let updated = registry::transition(&spot, target)?;
        write_spot_status(&mut tx, &updated).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn open_reservation(
        &self,
        new: NewReservation,
        created_at: DateTime<Utc>,
    ) -> ParkingResult<Reservation> {
        let mut tx = self.begin().await?;
        let spot = lock_spot(&mut tx, new.spot_id).await?;
        let user_open = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 AND end_time IS NULL"
        ))
        .bind(new.user_id)
        .fetch_optional(&mut *tx)
        .await?;
        ledger::admit(&new, &spot, user_open.as_ref())?;
        let occupied = registry::transition(&spot, SpotStatus::Occupied)?;

        let reservation = new.into_reservation(created_at);
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, spot_id, user_id, start_time, hourly_rate, vehicle_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.spot_id)
        .bind(reservation.user_id)
        .bind(reservation.start_time)
        .bind(reservation.hourly_rate)
        .bind(&reservation.vehicle_number)
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some(ONE_OPEN_PER_SPOT) => ParkingError::SpotUnavailable(reservation.spot_id),
            Some(ONE_OPEN_PER_USER) => ParkingError::UserAlreadyActive(reservation.user_id),
            _ => ParkingError::Storage(e),
        })?;
        write_spot_status(&mut tx, &occupied).await?;

        tx.commit().await?;
        Ok(reservation)
    }

    async fn close_reservation(
        &self,
        reservation_id: Uuid,
        end_time: DateTime<Utc>,
        zone: CivilZone,
    ) -> ParkingResult<Reservation> {
        let mut tx = self.begin().await?;
        // Spot first, then reservation: the same order open_reservation uses.
        let (spot_id,): (Uuid,) =
            sqlx::query_as("SELECT spot_id FROM reservations WHERE id = $1")
                .bind(reservation_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(ParkingError::ReservationNotFound(reservation_id))?;
        let spot = lock_spot(&mut tx, spot_id).await?;
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ParkingError::ReservationNotFound(reservation_id))?;

        let closed = ledger::settle(&reservation, end_time, zone)?;
        let available = registry::transition(&spot, SpotStatus::Available)?;

        let res = sqlx::query(
            "UPDATE reservations SET end_time = $2, total_cost = $3 \
             WHERE id = $1 AND end_time IS NULL",
        )
        .bind(closed.id)
        .bind(closed.end_time)
        .bind(closed.total_cost)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() < 1 {
            return Err(ParkingError::ReservationAlreadyClosed(reservation_id));
        }
        write_spot_status(&mut tx, &available).await?;

        tx.commit().await?;
        Ok(closed)
    }

    async fn get_reservation(&self, reservation_id: Uuid) -> ParkingResult<Option<Reservation>> {
        Ok(sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn open_reservation_for_spot(
        &self,
        spot_id: Uuid,
    ) -> ParkingResult<Option<Reservation>> {
        Ok(sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE spot_id = $1 AND end_time IS NULL"
        ))
        .bind(spot_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn open_reservation_for_user(
        &self,
        user_id: Uuid,
    ) -> ParkingResult<Option<Reservation>> {
        Ok(sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 AND end_time IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn reservations_for_user(
        &self,
        user_id: Uuid,
    ) -> ParkingResult<Vec<ReservationDetails>> {
        Ok(sqlx::query_as::<_, ReservationDetails>(
            r#"
            SELECT
                r.id, r.spot_id, r.user_id, r.start_time, r.end_time,
                r.hourly_rate, r.total_cost, r.vehicle_number, r.created_at,
                s.label AS spot_label,
                s.lot_id,
                l.name AS lot_name
            FROM reservations AS r
            INNER JOIN parking_spots AS s ON s.id = r.spot_id
            INNER JOIN parking_lots AS l ON l.id = s.lot_id
            WHERE r.user_id = $1
            ORDER BY r.start_time DESC, r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
