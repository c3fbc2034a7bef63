//! PRN indexed satellite container
use log::warn;

use crate::{
    constants::MAX_GPS_PRN,
    error::Error,
    prelude::{Constellation, SV},
};

const CAPACITY: usize = MAX_GPS_PRN as usize;

/// Builds the GPS [SV] stored at given slot
fn slot_sv(index: usize) -> SV {
    SV::new(Constellation::GPS, (index + 1) as u8)
}

/// Returns the slot index of this [SV], if it may be tracked
fn slot_index(sv: SV) -> Result<usize, Error> {
    if sv.constellation != Constellation::GPS || sv.prn == 0 || sv.prn > MAX_GPS_PRN {
        Err(Error::InvalidSatellite(sv))
    } else {
        Ok((sv.prn - 1) as usize)
    }
}

/// [SatelliteMap] maps each GPS satellite (PRN 1..=32) to an optional value.
/// Capacity is fixed, an absent entry means the satellite is not tracked
/// (or not useful) during this epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteMap<T> {
    slots: [Option<T>; CAPACITY],
}

impl<T> Default for SatelliteMap<T> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl<T> SatelliteMap<T> {
    /// Builds a new empty [SatelliteMap]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value for this [SV], returning the previous one.
    pub fn insert(&mut self, sv: SV, value: T) -> Result<Option<T>, Error> {
        let index = slot_index(sv)?;
        Ok(self.slots[index].replace(value))
    }

    /// Removes this [SV], returning its value.
    pub fn remove(&mut self, sv: SV) -> Option<T> {
        let index = slot_index(sv).ok()?;
        self.slots[index].take()
    }

    pub fn get(&self, sv: SV) -> Option<&T> {
        let index = slot_index(sv).ok()?;
        self.slots[index].as_ref()
    }

    pub fn get_mut(&mut self, sv: SV) -> Option<&mut T> {
        let index = slot_index(sv).ok()?;
        self.slots[index].as_mut()
    }

    pub fn contains(&self, sv: SV) -> bool {
        self.get(sv).is_some()
    }

    /// Number of satellites present
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Drops all entries. Scratch maps are cleared at the start of each epoch.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Iterates present entries in increasing PRN order
    pub fn iter(&self) -> impl Iterator<Item = (SV, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|value| (slot_sv(i), value)))
    }

    /// Mutable iteration of present entries in increasing PRN order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SV, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|value| (slot_sv(i), value)))
    }

    /// Present satellites in increasing PRN order
    pub fn satellites(&self) -> Vec<SV> {
        self.iter().map(|(sv, _)| sv).collect()
    }

    /// Retains only the entries for which the predicate holds.
    pub fn retain<F: FnMut(SV, &T) -> bool>(&mut self, mut f: F) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let keep = match slot {
                Some(value) => f(slot_sv(i), value),
                None => true,
            };
            if !keep {
                *slot = None;
            }
        }
    }

    /// Converts each present entry, keeping the PRN layout.
    pub fn map<U, F: FnMut(SV, &T) -> U>(&self, mut f: F) -> SatelliteMap<U> {
        let mut mapped = SatelliteMap::<U>::default();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(value) = slot {
                mapped.slots[i] = Some(f(slot_sv(i), value));
            }
        }
        mapped
    }
}

impl<T> FromIterator<(SV, T)> for SatelliteMap<T> {
    fn from_iter<I: IntoIterator<Item = (SV, T)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (sv, value) in iter {
            if let Err(e) = map.insert(sv, value) {
                warn!("{}", e);
            }
        }
        map
    }
}
