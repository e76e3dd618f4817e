//! Gender/race/job derived from character class (`spec.md` §4.7), taken
//! verbatim from `quest_functions.c`'s `genders`/`races`/`jobs` tables.

const GENDERS: [i32; 12] = [0, 1, 0, 0, 0, 1, 1, 0, 1, 1, 0, 1];
const RACES: [i32; 12] = [0, 1, 2, 0, 2, 2, 0, 1, 1, 2, 0, 0];
const JOBS: [i32; 12] = [0, 0, 0, 1, 1, 1, 2, 2, 2, 0, 2, 1];

fn lookup(class: i32, table: &[i32; 12]) -> i32 {
    if (0..12).contains(&class) {
        table[class as usize]
    } else {
        -1
    }
}

pub fn gender_of(class: i32) -> i32 {
    lookup(class, &GENDERS)
}

pub fn race_of(class: i32) -> i32 {
    lookup(class, &RACES)
}

pub fn job_of(class: i32) -> i32 {
    lookup(class, &JOBS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_classes_resolve() {
        assert_eq!(gender_of(0), 0);
        assert_eq!(race_of(1), 1);
        assert_eq!(job_of(3), 1);
    }

    #[test]
    fn out_of_range_class_is_negative_one() {
        assert_eq!(gender_of(12), -1);
        assert_eq!(race_of(-1), -1);
    }
}
