/// Record categories holding clinical narrative. Rows in these categories go
/// through entity recognition; every other category is structured and only
/// sees the blacklist.
pub const FREETEXT_CATEGORIES: &[&str] = &[
    "Arztnotizen",
    "Anamnese",
    "Visite",
    "Status",
    "Anästhesieübergabe",
    "Kardiotechnik (Notizen)",
    "Mikrobiologie",
    "Atmungstherapie",
    "Bronchoskopie",
    "Meilensteine",
    "Visite durchgeführt von",
    "weitere TeilnehmerInnen",
    "fachärztliche Behandlungsleitung",
    "fachärztliche Behandlungsleitung (WDA1I, WD4I)",
    "Anästhesiepflege",
    "HK Befund",
    "Reanimation",
    "Verbal Rate Skala",
    "Intensivmedizin",
    "Operation/Datum/Operateur",
    "Therapieplanung Folgewoche/Ziele/Sonstiges",
    "Behandlungsergebnisse/akt. Situation",
];

/// Exact, case-sensitive membership test.
pub fn is_freetext_category(category: &str) -> bool {
    FREETEXT_CATEGORIES.contains(&category)
}
