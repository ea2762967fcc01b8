/*!

This is the long-form manual for `scenario_engine` and `elsim`.

## Scenarios

A scenario has a round mode, a list of candidates and the votes of each region.

* In the **first round**, the candidates entered by the user are followed by an extra
  `Others` candidate that stands for all the remaining candidates.
* In the **second round**, there are exactly two candidates.

Each candidate has an ordinal, assigned when the candidate is created. The votes of a region
are a list indexed by ordinal. Removing a candidate does not shift the ordinals of the other
candidates.

A region is *configured* once it has received at least one vote. Regions that are not
configured are left out of the margins and of the rankings.

## Scenario documents

Scenarios are exported and imported as JSON:

```json
{
  "version": "1.0",
  "exportTimestamp": "2024-09-01T10:00:00Z",
  "roundMode": "second",
  "candidates": [
    {"name": "Anna", "party": "PA", "color": "#ff0000", "ordinal": 0, "isOthers": false},
    {"name": "Bob", "party": "PB", "color": "#0000ff", "ordinal": 1, "isOthers": false}
  ],
  "voteMatrix": {
    "BR-SP": [700, 300],
    "BR-RJ": [520, 480]
  }
}
```

The order of the regions in `voteMatrix` is kept. It decides between regions that have the
same number of votes in the rankings.

Documents written by older versions of the simulator (`turno`, `candidatos`,
`votosPorEstado`, with the round mode written `1o` or `2o`) are also accepted.

## Share links

A share link carries the round mode, the candidates and the votes as base64-encoded JSON in
the `scenario` query parameter:

```text
https://example.org/sim?scenario=eyJyb3VuZE1vZGUiOi...
```

The payload is percent-encoded in the link. `elsim --input-type share --input '<link or
payload>'` loads such a link, with upper or lower case escapes.

## Limits

Ordinals stay below 1024, removed candidates included, and one count may not exceed 10^12
votes. Documents and edits beyond these limits are rejected.

## Spreadsheets

`elsim --input-type xlsx --input votes.xlsx` reads the first worksheet of an Excel file:

|        | Anna | Bob | Others |
|--------|------|-----|--------|
| BR-SP  | 5000 | 4000| 1000   |
| BR-RJ  | 2600 | 2400| 0      |

The first row holds the names of the candidates. A last column named `Others` (or `Outros`)
becomes the `Others` candidate of a first round.

## Analysis

For every configured region, the winner is the candidate with the most votes. Ties go to the
candidate with the lowest ordinal. The runner-up is the best of the other candidates, with
the same rule, so that a tie for the first place gives a margin of zero between two distinct
candidates.

* The **margin** is the difference between the percentages of the winner and of the
  runner-up, rounded to one decimal.
* A **swing region** has a margin below 10 points.
* The winner has an **absolute majority** with at least half of the votes of the region.
* The **most balanced** and **most concentrated** regions are the regions with the smallest
  and largest margins, leaving out regions with a margin of zero.

Nationally, the leader is elected in the first round with at least 50% of all the votes.
Otherwise, a second round is needed.

*/
