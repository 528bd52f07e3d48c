use crate::config::{CorrectionConfig, HeadingMode, NavPrecedence, PositionShift, ScalarAdjust};
use crate::math::{coor_scale, normalize_heading, LonFlip};
use crate::prelude::{ProcessResult, ProcessingStage};
use crate::series::navfile::{self, AdjustedNavigation, Navigation};
use crate::series::{tablefile, InterpMode, SeriesCursor, TimeSeries};
use crate::swath::{Kinematics, PingState};

/// Which optional navigation columns replace the recorded values.
#[derive(Debug, Clone, Copy, Default)]
struct NavigationMerge {
    interp: InterpMode,
    heading: bool,
    speed: bool,
    draft: bool,
    attitude: bool,
}

/// A table plus the cursor that walks it in ping order.
struct Tracked<T> {
    table: T,
    cursor: SeriesCursor,
}

impl<T> Tracked<T> {
    fn new(table: T) -> Self {
        Self {
            table,
            cursor: SeriesCursor::default(),
        }
    }
}

/// Resolves position, attitude, draft, speed and heading for each ping from
/// the recorded values and the merged auxiliary tables.
pub struct KinematicsStage {
    lonflip: LonFlip,
    navigation: Option<Tracked<Navigation>>,
    merge: NavigationMerge,
    adjusted: Option<Tracked<AdjustedNavigation>>,
    adjusted_interp: InterpMode,
    precedence: NavPrecedence,
    attitude: Option<Tracked<TimeSeries>>,
    tide: Option<Tracked<TimeSeries>>,
    shift: PositionShift,
    draft: ScalarAdjust,
    course_made_good: bool,
    heading_mode: HeadingMode,
    heading_offset: f64,
    previous: Option<Kinematics>,
}

impl KinematicsStage {
    pub fn new(
        config: &CorrectionConfig,
        navigation: Option<Navigation>,
        adjusted: Option<AdjustedNavigation>,
        attitude: Option<TimeSeries>,
        tide: Option<TimeSeries>,
    ) -> Self {
        let nav = &config.navigation;
        Self {
            lonflip: config.lonflip,
            navigation: navigation.map(Tracked::new),
            merge: NavigationMerge {
                interp: nav.interp,
                heading: nav.heading,
                speed: nav.speed,
                draft: nav.draft,
                attitude: nav.attitude,
            },
            adjusted: adjusted.map(Tracked::new),
            adjusted_interp: config.adjusted_nav.interp,
            precedence: config.nav_precedence,
            attitude: attitude.map(Tracked::new),
            tide: tide.map(Tracked::new),
            shift: config.position_shift,
            draft: config.draft,
            course_made_good: config.needs_course_made_good(),
            heading_mode: config.heading_mode,
            heading_offset: config.heading_offset,
            previous: None,
        }
    }

    /// Returns the lower bracketing navigation index used, if any.
    fn merge_navigation(&mut self, kinematics: &mut Kinematics) -> Option<usize> {
        let nav = self.navigation.as_mut()?;
        let series = &nav.table.series;
        let time = kinematics.time;
        let (lon, j) = series.interpolate(&mut nav.cursor, navfile::LON, time, self.merge.interp);
        let (lat, _) = series.interpolate(&mut nav.cursor, navfile::LAT, time, self.merge.interp);
        kinematics.lon = lon;
        kinematics.lat = lat;

        let mut linear = |channel: usize| series.interpolate(&mut nav.cursor, channel, time, InterpMode::Linear).0;
        if nav.table.has_motion {
            if self.merge.heading {
                kinematics.heading = normalize_heading(linear(navfile::HEADING));
            }
            if self.merge.speed {
                kinematics.speed = linear(navfile::SPEED);
            }
            if self.merge.draft {
                kinematics.draft = linear(navfile::DRAFT);
            }
        }
        if nav.table.has_attitude && self.merge.attitude {
            kinematics.roll = linear(navfile::ROLL);
            kinematics.pitch = linear(navfile::PITCH);
            kinematics.heave = linear(navfile::HEAVE);
        }
        Some(j)
    }

    fn merge_attitude(&mut self, kinematics: &mut Kinematics) {
        if let Some(attitude) = self.attitude.as_mut() {
            let time = kinematics.time;
            let mut value = |channel: usize| {
                attitude
                    .table
                    .interpolate(&mut attitude.cursor, channel, time, InterpMode::Linear)
                    .0
            };
            kinematics.roll = value(tablefile::ROLL);
            kinematics.pitch = value(tablefile::PITCH);
            kinematics.heave = value(tablefile::HEAVE);
        }
    }

    /// Moves the position from the antenna to the vessel reference point and
    /// applies the absolute shifts.
    fn shift_position(&self, kinematics: &mut Kinematics) {
        if !self.shift.enabled {
            return;
        }
        let (mtodeglon, mtodeglat) = coor_scale(kinematics.lat);
        let (headx, heady) = kinematics.heading.to_radians().sin_cos();
        let s = &self.shift;
        kinematics.lon -= heady * mtodeglon * s.offset_x + headx * mtodeglon * s.offset_y
            - mtodeglon * s.shift_x
            - s.shift_lon;
        kinematics.lat -= -headx * mtodeglat * s.offset_x + heady * mtodeglat * s.offset_y
            - mtodeglat * s.shift_y
            - s.shift_lat;
    }

    /// Returns the lower bracketing adjusted-navigation index used, if any.
    fn merge_adjusted(&mut self, kinematics: &mut Kinematics, nav_merged: bool) -> Option<usize> {
        let adjusted = self.adjusted.as_mut()?;
        let series = &adjusted.table.series;
        let time = kinematics.time;
        let (lon, j) = series.interpolate(&mut adjusted.cursor, navfile::LON, time, self.adjusted_interp);
        let (lat, _) = series.interpolate(&mut adjusted.cursor, navfile::LAT, time, self.adjusted_interp);
        if !(nav_merged && self.precedence == NavPrecedence::NavigationFirst) {
            kinematics.lon = lon;
            kinematics.lat = lat;
        }
        if adjusted.table.has_depth {
            let (z, _) = series.interpolate(&mut adjusted.cursor, navfile::Z_OFFSET, time, self.adjusted_interp);
            kinematics.draft += z;
        }
        Some(j)
    }

    fn apply_tide(&mut self, kinematics: &mut Kinematics) {
        if let Some(tide) = self.tide.as_mut() {
            let (value, _) = tide
                .table
                .interpolate(&mut tide.cursor, tablefile::TIDE, kinematics.time, InterpMode::Linear);
            kinematics.draft -= value;
        }
    }

    /// Two positions bracketing the ping: navigation samples when available,
    /// else adjusted navigation, else the previous ping.
    fn course_segment(&self, nav_index: Option<usize>, adjusted_index: Option<usize>, current: &Kinematics) -> Option<[(f64, f64, f64); 2]> {
        let from_series = |series: &TimeSeries, j: usize| {
            (j + 1 < series.len()).then(|| {
                let sample = |i: usize| {
                    (
                        series.times()[i],
                        series.value_at(navfile::LON, i),
                        series.value_at(navfile::LAT, i),
                    )
                };
                [sample(j), sample(j + 1)]
            })
        };
        if let (Some(nav), Some(j)) = (&self.navigation, nav_index) {
            return from_series(&nav.table.series, j);
        }
        if let (Some(adjusted), Some(j)) = (&self.adjusted, adjusted_index) {
            return from_series(&adjusted.table.series, j);
        }
        self.previous.map(|previous| {
            [
                (previous.time, previous.lon, previous.lat),
                (current.time, current.lon, current.lat),
            ]
        })
    }

    fn apply_course_made_good(&self, kinematics: &mut Kinematics, nav_index: Option<usize>, adjusted_index: Option<usize>) {
        let fallback = self.previous.unwrap_or(*kinematics);
        let (mut heading, mut speed) = (fallback.heading, fallback.speed);
        if let Some([(t0, lon0, lat0), (t1, lon1, lat1)]) = self.course_segment(nav_index, adjusted_index, kinematics) {
            let (mtodeglon, mtodeglat) = coor_scale(lat1);
            let dx = (lon1 - lon0) / mtodeglon;
            let dy = (lat1 - lat0) / mtodeglat;
            let dist = dx.hypot(dy);
            let dt = t1 - t0;
            if dist > 0.0 && dt > 0.0 {
                speed = 3.6 * dist / dt;
                heading = normalize_heading((dx / dist).atan2(dy / dist).to_degrees());
            }
        }
        kinematics.speed = speed;
        if self.heading_mode.uses_course() {
            kinematics.heading = heading;
        }
    }
}

impl ProcessingStage for KinematicsStage {
    fn name(&self) -> &'static str {
        "kinematics"
    }

    fn execute(&mut self, state: &mut PingState<'_>) -> ProcessResult<()> {
        let mut kinematics = state.kinematics;

        let nav_index = self.merge_navigation(&mut kinematics);
        self.merge_attitude(&mut kinematics);
        self.shift_position(&mut kinematics);
        kinematics.draft = self.draft.apply(kinematics.draft);
        let adjusted_index = self.merge_adjusted(&mut kinematics, nav_index.is_some());
        self.apply_tide(&mut kinematics);

        if self.course_made_good {
            self.apply_course_made_good(&mut kinematics, nav_index, adjusted_index);
        }
        if self.heading_mode.uses_offset() {
            kinematics.heading += self.heading_offset;
        }
        kinematics.heading = normalize_heading(kinematics.heading);
        kinematics.lon = self.lonflip.apply(kinematics.lon);

        state.kinematics = kinematics;
        self.previous = Some(kinematics);
        Ok(())
    }
}
