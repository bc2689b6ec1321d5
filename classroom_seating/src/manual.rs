/*!

This is the long-form manual for `classroom_seating` and `seatbook`.

## Share codes

A share code carries the seating and the attendance of one class on one date.
It is meant to be pasted in a chat message, so it stays short. The class must
exist on both sides with the same roster: students are referred to by their
position in the roster.

Three versions are understood:
* `SEAT_TXT_v1:` readable text, produced when it fits in 2800 characters
* `SEAT_BIN_v1:` base64 encoded JSON, produced for larger classes
* `SEAT_DATA_v1:` the first version, with names in clear. It is read but never produced.

### `SEAT_TXT_v1`

```text
SEAT_TXT_v1:1A|2024-05-06|6x8|S:6,1:1;2,8:0|A:迟:2,2;假:0|R:3:6b1fd0c2
```

The sections are separated by `|`:
- the class name, the date and the size of the grid (`<rows>x<columns>`)
- `S:` the seats, as `row,column:student`. Rows are counted from the back of the room,
  columns from the left, without counting the aisles. A student that the sender
  could not find in its roster is written `?`.
- `A:` the attendance, as `category:student,student`. A student appears as many times
  as recorded, which counts as several infractions.
- `R:` the fingerprint of the roster: the number of students and the start of the
  SHA-256 hash of the names. It is optional.

Only the first three sections are required.

A class name or a date containing `|` always produces a binary code.

### `SEAT_BIN_v1`

The same content as JSON, encoded in base64:

```text
{"c":"1A","d":"2024-05-06","r":6,"o":8,"s":[[6,1,1],[2,8,0]],"a":{"1":[2,2],"2":[0]},"k":"3:6b1fd0c2"}
```

Categories are referred to by their position in the registry: `"1"` is `迟` in the
reference registry. Reordering the categories changes the meaning of existing codes.

### `SEAT_DATA_v1`

The session as JSON with the names of the students, percent-encoded, then encoded
in base64. Names that are not in the local roster are dropped when reading.

## Roster fingerprint

When the fingerprint of a code differs from the fingerprint of the local roster, the
students were probably added, removed or reordered on one side. The positions in the
code may then designate other students. `seatbook import` refuses such a code unless
`--force` is given.

## Categories

| category | meaning | penalty | exclusive |
|----------|---------|---------|-----------|
| 加 | bonus | -1 | no |
| 迟 | late | 1 | no |
| 假 | on leave | 1 | yes |
| 旷 | absent | 5 | no |
| 睡 | asleep | 2 | no |
| 玩 | playing | 2 | no |

A student on leave is removed from the seating and cannot be seated until taken
off the leave list.

## Scores

Every student starts at 100. Each occurrence in a category subtracts its penalty,
then the manual bonus is added. The scores above 100 are averaged into a benchmark,
and all the scores are multiplied by `100 / benchmark`, rounded and kept within
`[0, 100]`. When no student is above 100, the scores are only clamped.

## Configuration

`seatbook` reads an optional JSON configuration file (`--config`):

```text
{
  "storePath": "seatbook.json",
  "exportTextBudget": 2800,
  "clipboardCommand": ["xclip", "-selection", "clipboard"],
  "defaultLayout": {"rows": 11, "columns": 12, "aisleColumns": [4, 9]}
}
```

All the fields are optional. The command line flags take precedence.

The store file holds one JSON document per key:
`classes`, `attendanceCategories`, `currentLayoutConfig`, and for each class
`<class>`, `<class>_seatLayout` and `<class>_bonus`.

 */
